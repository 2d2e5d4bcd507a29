//! # order-grader
//!
//! Grades retail-order analytics submissions written in Python or Java:
//! textual source checks, a run against a known fixture, artifact
//! validation, a missing-input probe, and the submission's own tests.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Rubric loading and the per-run grading context
pub mod config;
/// A module defining a bunch of constant values to be used throughout
pub mod constants;
/// For all things related to grading
pub mod grade;
/// Subprocess execution with timeouts
pub mod process;
/// Language detection and per-language submission handling
pub mod submission;
/// Utility functions for convenience
pub mod util;

pub use config::{GradingContext, Rubric};
pub use grade::{GradeReport, grade_submission};
pub use submission::{Language, detect_language};
