#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Rubric loading and the per-run grading context.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{DEFAULT_FIXTURE, DEFAULT_THRESHOLD, DEFAULT_TIMEOUT_SECS, RUBRIC_ENV, RUBRIC_FILE},
    grade::results::Check,
};

/// Errors raised while reading a rubric file.
#[derive(thiserror::Error, Debug)]
pub enum RubricError {
    /// The rubric file could not be read.
    #[error("Could not read rubric at {path}")]
    Read {
        /// Path that was attempted.
        path:   PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The rubric file is not a valid rubric document.
    #[error("Rubric at {path} is malformed")]
    Parse {
        /// Path that was attempted.
        path:   PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The weights add up to more than a score can hold.
    #[error("Rubric weights add up to more than {}", u32::MAX)]
    WeightsOverflow,
    /// The float tolerance is negative or not a number.
    #[error("Rubric float tolerance must be a non-negative number, got {0}")]
    InvalidTolerance(f64),
}

/// Point value of every graded check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Weights {
    /// Required function definitions present.
    pub functions:             u32,
    /// Looping or conditional constructs present.
    pub control_flow:          u32,
    /// `Order` class with a total method present.
    pub oop:                   u32,
    /// Program ran against the fixture and exited zero.
    pub file_io:               u32,
    /// Artifacts match the fixture's expected results.
    pub analytics_correctness: u32,
    /// Program exits non-zero on a missing input file.
    pub error_handling:        u32,
    /// The submission's own tests pass.
    pub unit_tests:            u32,
}

impl Weights {
    /// Points awarded for `check` when it passes.
    pub fn get(&self, check: Check) -> u32 {
        match check {
            Check::Functions => self.functions,
            Check::ControlFlow => self.control_flow,
            Check::Oop => self.oop,
            Check::FileIo => self.file_io,
            Check::AnalyticsCorrectness => self.analytics_correctness,
            Check::ErrorHandling => self.error_handling,
            Check::UnitTests => self.unit_tests,
        }
    }

    /// Sum of all weights, or `None` when it does not fit in a `u32`.
    pub fn checked_total(&self) -> Option<u32> {
        Check::ALL
            .iter()
            .try_fold(0u32, |acc, check| acc.checked_add(self.get(*check)))
    }

    /// Sum of all weights, saturating at `u32::MAX`.
    pub fn total(&self) -> u32 {
        self.checked_total().unwrap_or(u32::MAX)
    }
}

/// Numeric tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Epsilon for approximate float comparisons.
    pub float: f64,
}

/// Default for the `timeout_seconds` rubric field.
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Weights, tolerance, and timeout for a grading run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    /// Points per check.
    pub weights:         Weights,
    /// Comparison tolerances.
    pub tolerances:      Tolerances,
    /// Ceiling for every subprocess invocation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,
}

impl Rubric {
    /// Parses a rubric from JSON text.
    pub fn from_json(text: &str, origin: &Path) -> Result<Self, RubricError> {
        let rubric: Rubric = serde_json::from_str(text).map_err(|source| RubricError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

        if rubric.weights.checked_total().is_none() {
            return Err(RubricError::WeightsOverflow);
        }

        let tol = rubric.tolerances.float;
        if tol.is_nan() || tol < 0.0 {
            return Err(RubricError::InvalidTolerance(tol));
        }
        Ok(rubric)
    }

    /// Reads and parses the rubric at `path`.
    pub fn load(path: &Path) -> Result<Self, RubricError> {
        let text = std::fs::read_to_string(path).map_err(|source| RubricError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text, path)
    }

    /// Subprocess deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Maximum attainable score.
    pub fn max_score(&self) -> u32 {
        self.weights.total()
    }

    /// Float comparison epsilon.
    pub fn tolerance(&self) -> f64 {
        self.tolerances.float
    }
}

/// Resolves which rubric file to use: an explicit path, then the
/// `GRADER_RUBRIC` environment variable, then `autograder/rubric.json` under
/// the submission root.
pub fn rubric_path(explicit: Option<PathBuf>, root: &Path) -> PathBuf {
    explicit
        .or_else(|| {
            std::env::var(RUBRIC_ENV)
                .ok()
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| root.join(RUBRIC_FILE))
}

/// Everything a grading run needs, built once and handed down to each stage.
#[derive(Debug, Clone, Builder)]
pub struct GradingContext {
    /// Submission root; every subprocess runs here.
    #[builder(into)]
    root:      PathBuf,
    /// Loaded rubric.
    rubric:    Rubric,
    /// Fixture CSV handed to the program. Relative paths resolve against
    /// `root`.
    #[builder(into, default = PathBuf::from(DEFAULT_FIXTURE))]
    fixture:   PathBuf,
    /// High-value threshold handed to the program.
    #[builder(default = DEFAULT_THRESHOLD)]
    threshold: f64,
}

impl GradingContext {
    /// Submission root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loaded rubric.
    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    /// Fixture CSV path as passed to the program.
    pub fn fixture(&self) -> &Path {
        &self.fixture
    }

    /// High-value threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Subprocess deadline from the rubric.
    pub fn timeout(&self) -> Duration {
        self.rubric.timeout()
    }
}
