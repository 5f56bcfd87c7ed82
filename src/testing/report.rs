//! JUnit XML report
//!
//! One `<testsuite>` holding one `<testcase>` per scenario, in run order.
//! The document carries no timestamps or host names: two runs over the same
//! binaries and traces differ only in their `time` attributes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use super::runner::{ExecutionResult, Status};
use crate::common::{Error, Result};

/// All results of one suite run
#[derive(Debug, Clone)]
pub struct Report {
    pub suite_name: String,
    pub results: Vec<ExecutionResult>,
}

impl Report {
    pub fn new(suite_name: &str, results: Vec<ExecutionResult>) -> Self {
        Self {
            suite_name: suite_name.to_string(),
            results,
        }
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_passed()).count()
    }

    /// Output mismatches (JUnit failures)
    pub fn failures(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == Status::OutputMismatch)
            .count()
    }

    /// Exit status problems and timeouts (JUnit errors)
    pub fn errors(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_error()).count()
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.results.len()
    }

    pub fn total_time(&self) -> Duration {
        self.results.iter().map(|r| r.elapsed).sum()
    }

    /// Serialize as JUnit XML
    pub fn write_junit(&self, writer: &mut dyn Write) -> std::io::Result<()> {
        let total = self.total_time().as_secs_f64();

        writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            writer,
            r#"<testsuites tests="{}" failures="{}" errors="{}" time="{:.3}">"#,
            self.results.len(),
            self.failures(),
            self.errors(),
            total
        )?;
        writeln!(
            writer,
            r#"  <testsuite name="{}" tests="{}" failures="{}" errors="{}" skipped="0" time="{:.3}">"#,
            escape_xml(&self.suite_name),
            self.results.len(),
            self.failures(),
            self.errors(),
            total
        )?;

        for result in &self.results {
            write_testcase(writer, result)?;
        }

        writeln!(writer, "  </testsuite>")?;
        writeln!(writer, "</testsuites>")?;
        Ok(())
    }

    /// The JUnit document as a string
    pub fn to_junit_string(&self) -> std::io::Result<String> {
        let mut buf = Vec::new();
        self.write_junit(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write the report to `path`, replacing any previous report
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let report_error = |e: std::io::Error| Error::ReportWrite {
            path: path.display().to_string(),
            error: e.to_string(),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(report_error)?;
        }
        let mut writer = BufWriter::new(File::create(path).map_err(report_error)?);
        self.write_junit(&mut writer).map_err(report_error)?;
        writer.flush().map_err(report_error)?;

        tracing::info!(path = %path.display(), "Report written");
        Ok(())
    }
}

fn write_testcase(writer: &mut dyn Write, result: &ExecutionResult) -> std::io::Result<()> {
    writeln!(
        writer,
        r#"    <testcase name="{}" classname="{}" time="{:.3}">"#,
        escape_xml(&result.name),
        escape_xml(&result.classname),
        result.elapsed.as_secs_f64()
    )?;

    if let Some(message) = result.status.message() {
        let (element, kind) = if result.status.is_error() {
            ("error", "error")
        } else {
            ("failure", "failure")
        };
        match result.detail.as_deref().map(str::trim) {
            Some(detail) if !detail.is_empty() => writeln!(
                writer,
                r#"      <{element} type="{kind}" message="{}">{}</{element}>"#,
                escape_xml(&message),
                escape_xml(detail)
            )?,
            _ => writeln!(
                writer,
                r#"      <{element} type="{kind}" message="{}"/>"#,
                escape_xml(&message)
            )?,
        }
    }

    let output = result.output.trim();
    if !output.is_empty() {
        writeln!(writer, "      <system-out>{}</system-out>", escape_xml(output))?;
    }

    writeln!(writer, "    </testcase>")
}

/// Escape XML special characters and drop characters XML 1.0 cannot carry
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}
