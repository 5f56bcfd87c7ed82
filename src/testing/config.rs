//! Test suite configuration types
//!
//! Defines the data structures for deserializing YAML suite files: the build
//! steps to run once up front and the ordered list of scenarios.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::{Error, Result};

/// Suite shipped with the binary, used when no `--suite` is given
const BUILTIN_SUITE: &str = include_str!("../../suites/tddb44.yaml");

/// A complete test suite loaded from a YAML file
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Suite {
    /// Name of the suite, used as the JUnit test suite name
    pub name: String,
    /// Where the JUnit report is written
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Diff the output of expected failures too, instead of passing them on
    /// exit status alone
    #[serde(default)]
    pub compare_failure_output: bool,
    /// Default timeout for every scenario; scenarios wait forever when unset
    pub timeout_secs: Option<u64>,
    /// Sub-projects to build before any scenario runs
    #[serde(default)]
    pub builds: Vec<BuildStep>,
    /// Scenarios, run in declaration order
    pub scenarios: Vec<Scenario>,
}

fn default_output() -> PathBuf {
    PathBuf::from("output.xml")
}

/// A build step run in a sub-project directory
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct BuildStep {
    /// Sub-project directory
    pub dir: PathBuf,
    /// Build command, `make` by default
    #[serde(default = "default_build_command")]
    pub command: Vec<String>,
}

fn default_build_command() -> Vec<String> {
    vec!["make".to_string()]
}

/// A single declared test case
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Test case name
    pub name: String,
    /// Classification label (JUnit `classname`); defaults to the name
    pub class: Option<String>,
    /// Working directory the command runs in
    pub cwd: PathBuf,
    /// Program followed by its arguments
    pub command: Vec<String>,
    /// Golden trace file
    pub expected: PathBuf,
    /// Whether the command is supposed to exit with a non-zero status
    #[serde(default)]
    pub expect_failure: bool,
    /// Overrides the suite-level timeout
    pub timeout_secs: Option<u64>,
}

impl Scenario {
    /// Classification label used to group results in the report
    pub fn classname(&self) -> &str {
        self.class.as_deref().unwrap_or(&self.name)
    }

    /// Program to execute (first element of the command)
    pub fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or_default()
    }

    /// Arguments passed to the program
    pub fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }
}

impl Suite {
    /// Load a suite file; relative paths resolve against its directory
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;

        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        tracing::debug!(suite = %path.display(), root = %root.display(), "Loading suite");
        Self::from_yaml(&content, &root)
    }

    /// The built-in compiler lab suite, rooted at the current directory
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_SUITE, Path::new("."))
    }

    /// Parse and validate a suite, resolving relative paths against `root`
    pub fn from_yaml(content: &str, root: &Path) -> Result<Self> {
        let mut suite: Suite =
            serde_yaml::from_str(content).map_err(|e| Error::SuiteParse(e.to_string()))?;
        suite.validate()?;
        suite.resolve_paths(root);
        Ok(suite)
    }

    /// Timeout that applies to `scenario`, if any
    pub fn timeout_for(&self, scenario: &Scenario) -> Option<Duration> {
        scenario
            .timeout_secs
            .or(self.timeout_secs)
            .map(Duration::from_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.scenarios.is_empty() {
            return Err(Error::Config(format!(
                "Suite '{}' declares no scenarios",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            if !seen.insert(scenario.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate scenario name '{}'",
                    scenario.name
                )));
            }
            if scenario.program().is_empty() {
                return Err(Error::Config(format!(
                    "Scenario '{}' has an empty command",
                    scenario.name
                )));
            }
            if scenario.timeout_secs == Some(0) {
                return Err(Error::Config(format!(
                    "Scenario '{}' has a zero timeout",
                    scenario.name
                )));
            }
        }

        for build in &self.builds {
            if build.command.first().map_or(true, |p| p.is_empty()) {
                return Err(Error::Config(format!(
                    "Build step for '{}' has an empty command",
                    build.dir.display()
                )));
            }
        }

        if self.timeout_secs == Some(0) {
            return Err(Error::Config("Suite timeout must be positive".to_string()));
        }

        Ok(())
    }

    fn resolve_paths(&mut self, root: &Path) {
        self.output = root.join(&self.output);
        for build in &mut self.builds {
            build.dir = root.join(&build.dir);
        }
        for scenario in &mut self.scenarios {
            scenario.cwd = root.join(&scenario.cwd);
            scenario.expected = root.join(&scenario.expected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name: demo
builds:
  - dir: scan
  - dir: tools
    command: ["sh", "build.sh"]
scenarios:
  - name: first
    cwd: scan
    command: ["./scanner", "in.d"]
    expected: trace/first.trace
  - name: second
    class: group
    cwd: scan
    command: ["./scanner", "bad.d"]
    expected: trace/second.trace
    expect_failure: true
    timeout_secs: 5
"#;

    #[test]
    fn test_parse_minimal_suite() {
        let suite = Suite::from_yaml(MINIMAL, Path::new("/labs")).unwrap();

        assert_eq!(suite.name, "demo");
        assert_eq!(suite.output, PathBuf::from("/labs/output.xml"));
        assert!(!suite.compare_failure_output);
        assert_eq!(suite.builds.len(), 2);
        assert_eq!(suite.builds[0].command, vec!["make".to_string()]);
        assert_eq!(suite.builds[1].dir, PathBuf::from("/labs/tools"));

        let first = &suite.scenarios[0];
        assert_eq!(first.classname(), "first");
        assert_eq!(first.cwd, PathBuf::from("/labs/scan"));
        assert_eq!(first.expected, PathBuf::from("/labs/trace/first.trace"));
        assert_eq!(first.program(), "./scanner");
        assert_eq!(first.args(), &["in.d".to_string()]);
        assert!(!first.expect_failure);

        let second = &suite.scenarios[1];
        assert_eq!(second.classname(), "group");
        assert!(second.expect_failure);
    }

    #[test]
    fn test_timeout_resolution() {
        let suite = Suite::from_yaml(MINIMAL, Path::new(".")).unwrap();
        assert_eq!(suite.timeout_for(&suite.scenarios[0]), None);
        assert_eq!(
            suite.timeout_for(&suite.scenarios[1]),
            Some(Duration::from_secs(5))
        );

        let with_default = format!("timeout_secs: 60\n{}", MINIMAL);
        let suite = Suite::from_yaml(&with_default, Path::new(".")).unwrap();
        assert_eq!(
            suite.timeout_for(&suite.scenarios[0]),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            suite.timeout_for(&suite.scenarios[1]),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let yaml = r#"
name: dup
scenarios:
  - name: a
    cwd: .
    command: ["true"]
    expected: a.trace
  - name: a
    cwd: .
    command: ["true"]
    expected: b.trace
"#;
        let err = Suite::from_yaml(yaml, Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("Duplicate scenario name 'a'"));
    }

    #[test]
    fn test_rejects_empty_command() {
        let yaml = r#"
name: empty
scenarios:
  - name: a
    cwd: .
    command: []
    expected: a.trace
"#;
        let err = Suite::from_yaml(yaml, Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_empty_suite_and_unknown_fields() {
        let err = Suite::from_yaml("name: none\nscenarios: []\n", Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let yaml = r#"
name: typo
scenarios:
  - name: a
    cwd: .
    command: ["true"]
    expected: a.trace
    expect_fail: true
"#;
        let err = Suite::from_yaml(yaml, Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::SuiteParse(_)));
    }

    #[test]
    fn test_builtin_suite_matches_lab_list() {
        let suite = Suite::builtin().unwrap();

        assert_eq!(suite.name, "TDDB44 Labs");
        assert_eq!(suite.builds.len(), 3);
        assert_eq!(suite.timeout_for(&suite.scenarios[0]), None);

        let names: Vec<_> = suite.scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "lab1", "lab2a", "lab2b", "lab2c", "lab3.1", "lab3.2", "lab3.3", "lab4.1",
                "lab4.2", "lab5", "lab6", "lab7"
            ]
        );

        let expected_failures: Vec<_> = suite
            .scenarios
            .iter()
            .filter(|s| s.expect_failure)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(expected_failures, ["lab3.2", "lab4.2"]);

        let lab1 = &suite.scenarios[0];
        assert_eq!(lab1.command, ["./scanner", "../testpgm/scannertest1.d"]);
        assert_eq!(lab1.expected, Path::new("./trace/scannertest1.trace"));
    }

    #[test]
    fn test_load_resolves_against_suite_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suite.yaml");
        std::fs::write(&path, MINIMAL).unwrap();

        let suite = Suite::load(&path).unwrap();
        assert_eq!(suite.scenarios[0].cwd, dir.path().join("scan"));
        assert_eq!(suite.output, dir.path().join("output.xml"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Suite::load(Path::new("/nonexistent/suite.yaml")).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
