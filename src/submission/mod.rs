#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Language detection and the per-language view of a submission.

/// Java submissions (`Order.java`, `OrderProcessor.java`).
pub mod java;
/// Python submissions (`process_orders.py`, `models.py`).
pub mod python;

use std::{
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use java::JavaSubmission;
pub use python::PythonSubmission;

use crate::process::{CommandSpec, ProcessError};

/// Languages a submission may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// CPython 3.
    Python,
    /// Java, compiled with `javac`.
    Java,
}

impl Language {
    /// Files whose presence identifies a submission in this language.
    pub fn markers(self) -> [&'static str; 2] {
        match self {
            Language::Python => python::MARKERS,
            Language::Java => java::MARKERS,
        }
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::Java => write!(f, "java"),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            other => Err(format!("unsupported language `{other}` (expected python or java)")),
        }
    }
}

/// Looks for marker files in `root`. Python is checked before Java; `None`
/// means neither language could be identified.
pub fn detect_language(root: &Path) -> Option<Language> {
    [Language::Python, Language::Java]
        .into_iter()
        .find(|lang| lang.markers().iter().any(|m| root.join(m).exists()))
}

/// Outcome of the textual source checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StaticChecks {
    /// At least one required function is defined.
    pub functions:    bool,
    /// A loop or conditional appears.
    pub control_flow: bool,
    /// The `Order` class defines a total method.
    pub oop:          bool,
}

/// Errors that stop a submission from being run at all.
#[derive(thiserror::Error, Debug)]
pub enum SubmissionError {
    /// The entry point source file does not exist.
    #[error("{} not found", .0.display())]
    MissingEntryPoint(PathBuf),
    /// A subprocess timed out or could not be started.
    #[error(transparent)]
    Process(#[from] ProcessError),
    /// Anything else, such as a missing toolchain.
    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

/// What the grader needs to know about a submission in one particular
/// language.
pub trait Submission {
    /// Language of this submission.
    fn language(&self) -> Language;

    /// Submission root directory.
    fn root(&self) -> &Path;

    /// File the program is started from. Its absence is a setup error.
    fn entry_point(&self) -> PathBuf;

    /// Textual checks for required functions, control flow, and the `Order`
    /// class.
    fn static_checks(&self) -> StaticChecks;

    /// Build step to run before the program, if the language has one.
    fn compile_command(&self) -> Result<Option<CommandSpec>>;

    /// Command that runs the program on `input`. The threshold flag is
    /// omitted when `threshold` is `None`.
    fn run_command(&self, input: &Path, threshold: Option<f64>) -> Result<CommandSpec>;

    /// Steps that build and run the submission's own tests, or `None` when
    /// it ships no test suite.
    fn test_suite(&self) -> Result<Option<Vec<CommandSpec>>>;
}

/// Reads a source file from the submission, treating absence as `None`.
pub(crate) fn read_source(root: &Path, name: &str) -> Option<String> {
    let path = root.join(name);
    match std::fs::read_to_string(&path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("{} is absent", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("Could not read {}: {}", path.display(), e);
            None
        }
    }
}

/// Whether `pattern` matches anywhere in `text`.
pub(crate) fn matches(pattern: &str, text: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(text),
        Err(e) => {
            tracing::warn!("Invalid source pattern `{}`: {}", pattern, e);
            false
        }
    }
}
