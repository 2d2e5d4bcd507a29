#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The grading pipeline: static checks, fixture run, artifact validation,
//! missing-input probe, unit tests, and scoring.

/// Running the submission and its tests.
pub mod execute;
/// Report types and score aggregation.
pub mod results;
/// Artifact validation against the fixture.
pub mod validate;

pub use execute::StageOutcome;
pub use results::{Check, CheckOutcome, GradeReport, Scorecard, pass_mark};
pub use validate::{ExpectedResults, ValidationIssues, approx, validate_outputs};

use crate::{
    config::GradingContext,
    constants::LOG_TAIL,
    submission::{JavaSubmission, Language, PythonSubmission, Submission, SubmissionError},
    util::tail,
};

/// Grades the submission in `ctx.root()` as `language`.
pub async fn grade_submission(language: Language, ctx: &GradingContext) -> GradeReport {
    match language {
        Language::Python => grade(&PythonSubmission::new(ctx.root()), ctx).await,
        Language::Java => grade(&JavaSubmission::new(ctx.root()), ctx).await,
    }
}

/// Runs every stage against `submission` and weighs the outcomes.
///
/// No stage short-circuits another; each failure is recorded as a failed
/// check.
pub async fn grade<S: Submission>(submission: &S, ctx: &GradingContext) -> GradeReport {
    let rubric = ctx.rubric();
    let mut card = Scorecard::new(rubric.weights);

    tracing::info!("Running static checks for {}", submission.language());
    let statics = submission.static_checks();
    card.record(Check::Functions, statics.functions, None, None);
    card.record(Check::ControlFlow, statics.control_flow, None, None);
    card.record(Check::Oop, statics.oop, None, None);

    tracing::info!("Running the program on {}", ctx.fixture().display());
    let (run, setup_error) = match execute::run_program(submission, ctx).await {
        Ok(outcome) => (outcome, None),
        Err(e @ SubmissionError::MissingEntryPoint(_)) => {
            tracing::error!("Setup problem: {}", e);
            (StageOutcome::fail(e.to_string()), Some(e.to_string()))
        }
        Err(e) => (StageOutcome::fail(format!("{e:#}")), None),
    };
    let run_logs = tail(&run.logs, LOG_TAIL);
    card.record(Check::FileIo, run.passed, None, Some(run_logs.clone()));

    tracing::info!("Validating outputs");
    let issues = validate_outputs(submission.root(), rubric.tolerance(), &ExpectedResults::default());
    card.record(Check::AnalyticsCorrectness, issues.is_empty(), Some(issues), None);

    tracing::info!("Probing the missing-input error path");
    let probe = execute::probe_error_path(submission, ctx).await;
    card.record(Check::ErrorHandling, probe.passed, None, Some(tail(&probe.logs, LOG_TAIL)));

    tracing::info!("Running the submission's unit tests");
    let tests = execute::run_unit_tests(submission, ctx).await;
    card.record(Check::UnitTests, tests.passed, None, Some(tail(&tests.logs, LOG_TAIL)));

    let report = card.finish(submission.language(), run_logs, setup_error);
    tracing::info!("Score: {}/{}", report.score(), report.max_score());
    report
}
