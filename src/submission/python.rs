#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{Language, StaticChecks, Submission, matches, read_source};
use crate::{
    constants::{PYTHON_ENTRY, PYTHON_MODELS, PYTHON_TEST_DIR},
    process::CommandSpec,
    util::python_path,
};

/// Files that identify a Python submission.
pub const MARKERS: [&str; 2] = [PYTHON_ENTRY, PYTHON_MODELS];

/// Definitions of any of these count as the required functions.
const FUNCTION_PATTERN: &str = r"def\s+(aggregate|filter_high_value|parse_args)\(";

/// Any loop or conditional keyword.
const CONTROL_FLOW_PATTERN: &str = r"for\s|while\s|if\s";

/// A Python submission rooted at a directory.
#[derive(Debug, Clone)]
pub struct PythonSubmission {
    /// Submission root.
    root: PathBuf,
}

impl PythonSubmission {
    /// Views `root` as a Python submission.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Submission for PythonSubmission {
    fn language(&self) -> Language {
        Language::Python
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn entry_point(&self) -> PathBuf {
        self.root.join(PYTHON_ENTRY)
    }

    fn static_checks(&self) -> StaticChecks {
        let mut checks = StaticChecks::default();

        if let Some(src) = read_source(&self.root, PYTHON_ENTRY) {
            checks.functions = matches(FUNCTION_PATTERN, &src);
            checks.control_flow = matches(CONTROL_FLOW_PATTERN, &src);
        }
        if let Some(models) = read_source(&self.root, PYTHON_MODELS) {
            checks.oop = models.contains("class Order") && models.contains("def total");
        }

        checks
    }

    fn compile_command(&self) -> Result<Option<CommandSpec>> {
        Ok(None)
    }

    fn run_command(&self, input: &Path, threshold: Option<f64>) -> Result<CommandSpec> {
        let mut cmd = CommandSpec::new(python_path()?)
            .arg(PYTHON_ENTRY)
            .arg("--input")
            .arg(input.as_os_str());
        if let Some(t) = threshold {
            cmd = cmd.arg("--threshold").arg(t.to_string());
        }
        Ok(cmd)
    }

    fn test_suite(&self) -> Result<Option<Vec<CommandSpec>>> {
        if !self.root.join(PYTHON_TEST_DIR).exists() {
            return Ok(None);
        }
        let unittest = CommandSpec::new(python_path()?).args(["-m", "unittest", "-q"]);
        Ok(Some(vec![unittest]))
    }
}
