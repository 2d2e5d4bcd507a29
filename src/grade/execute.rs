#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Running a submission: the fixture run, the missing-input probe, and its
//! own test suite.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{
    config::GradingContext,
    constants::{ARTIFACTS, MISSING_INPUT},
    process::run_collect,
    submission::{Submission, SubmissionError},
};

/// Whether a stage passed, with the output it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    /// Stage verdict.
    pub passed: bool,
    /// Captured output or failure description.
    pub logs:   String,
}

impl StageOutcome {
    /// A passing stage.
    pub fn pass(logs: impl Into<String>) -> Self {
        Self {
            passed: true,
            logs:   logs.into(),
        }
    }

    /// A failing stage.
    pub fn fail(logs: impl Into<String>) -> Self {
        Self {
            passed: false,
            logs:   logs.into(),
        }
    }
}

/// Deletes artifacts left by an earlier run. Absent files are fine.
pub fn clean_artifacts(root: &Path) -> anyhow::Result<()> {
    for name in ARTIFACTS {
        let path = root.join(name);
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!("Removed stale {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Could not delete {}", path.display()));
            }
        }
    }
    Ok(())
}

/// Fails with [`SubmissionError::MissingEntryPoint`] when the entry point
/// source is absent.
fn require_entry_point<S: Submission>(submission: &S) -> Result<(), SubmissionError> {
    let entry = submission.entry_point();
    if entry.exists() {
        return Ok(());
    }
    let shown = entry
        .strip_prefix(submission.root())
        .map(Path::to_path_buf)
        .unwrap_or(entry);
    Err(SubmissionError::MissingEntryPoint(shown))
}

/// Runs the language's build step. `Some(diagnostics)` means it failed.
async fn compile<S: Submission>(
    submission: &S,
    ctx: &GradingContext,
) -> Result<Option<String>, SubmissionError> {
    let Some(cmd) = submission.compile_command()? else {
        return Ok(None);
    };

    let result = run_collect(&cmd, submission.root(), ctx.timeout()).await?;
    if result.success() {
        Ok(None)
    } else {
        tracing::warn!("Compilation failed with {}", result.status);
        Ok(Some(result.combined()))
    }
}

/// Runs the submission against the fixture.
///
/// Stale artifacts are removed first. An absent entry point is a setup error
/// and is returned as [`SubmissionError::MissingEntryPoint`]; a failed build
/// is an unsuccessful run carrying the compiler output.
pub async fn run_program<S: Submission>(
    submission: &S,
    ctx: &GradingContext,
) -> Result<StageOutcome, SubmissionError> {
    clean_artifacts(submission.root())?;
    require_entry_point(submission)?;

    if let Some(diagnostics) = compile(submission, ctx).await? {
        return Ok(StageOutcome::fail(diagnostics));
    }

    let cmd = submission.run_command(ctx.fixture(), Some(ctx.threshold()))?;
    let result = run_collect(&cmd, submission.root(), ctx.timeout()).await?;

    Ok(StageOutcome {
        passed: result.success(),
        logs:   result.combined(),
    })
}

/// An input path, relative to `root`, that does not exist.
fn missing_input(root: &Path) -> PathBuf {
    let preferred = PathBuf::from(MISSING_INPUT);
    if !root.join(&preferred).exists() {
        return preferred;
    }
    PathBuf::from(format!("__grader_missing_{}.csv", uuid::Uuid::new_v4()))
}

/// Runs the submission on an input that does not exist. Passes only when the
/// program completes with a non-zero exit status.
pub async fn probe_error_path<S: Submission>(submission: &S, ctx: &GradingContext) -> StageOutcome {
    let probe = async {
        require_entry_point(submission)?;
        if let Some(diagnostics) = compile(submission, ctx).await? {
            return Ok(StageOutcome::fail(diagnostics));
        }

        let input = missing_input(submission.root());
        let cmd = submission.run_command(&input, None)?;
        let result = run_collect(&cmd, submission.root(), ctx.timeout()).await?;

        Ok::<_, SubmissionError>(StageOutcome {
            passed: !result.success(),
            logs:   result.combined(),
        })
    };

    match probe.await {
        Ok(outcome) => outcome,
        Err(e) => StageOutcome::fail(format!("{e:#}")),
    }
}

/// Runs the submission's own test suite. A submission without one passes.
pub async fn run_unit_tests<S: Submission>(submission: &S, ctx: &GradingContext) -> StageOutcome {
    let steps = match submission.test_suite() {
        Ok(Some(steps)) => steps,
        Ok(None) => {
            tracing::info!("No test suite shipped; unit tests pass by default");
            return StageOutcome::pass("");
        }
        Err(e) => return StageOutcome::fail(format!("Unit test run failed: {e:#}")),
    };

    let mut logs = String::new();
    for step in steps {
        match run_collect(&step, submission.root(), ctx.timeout()).await {
            Ok(result) => {
                logs.push_str(&result.combined());
                if !result.success() {
                    return StageOutcome::fail(logs);
                }
            }
            Err(e) => {
                logs.push_str(&format!("Unit test run failed: {e:#}"));
                return StageOutcome::fail(logs);
            }
        }
    }

    StageOutcome::pass(logs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Rubric,
        process::CommandSpec,
        submission::{Language, StaticChecks},
    };

    /// A submission whose every step is a shell one-liner.
    struct ShellSubmission {
        root:    PathBuf,
        compile: Option<&'static str>,
        run:     &'static str,
        tests:   Option<Vec<&'static str>>,
    }

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").arg("-c").arg(script)
    }

    impl Submission for ShellSubmission {
        fn language(&self) -> Language {
            Language::Python
        }

        fn root(&self) -> &Path {
            &self.root
        }

        fn entry_point(&self) -> PathBuf {
            self.root.join("entry")
        }

        fn static_checks(&self) -> StaticChecks {
            StaticChecks::default()
        }

        fn compile_command(&self) -> anyhow::Result<Option<CommandSpec>> {
            Ok(self.compile.map(sh))
        }

        fn run_command(&self, input: &Path, threshold: Option<f64>) -> anyhow::Result<CommandSpec> {
            let script = format!(
                "INPUT='{}'; THRESHOLD='{}'; {}",
                input.display(),
                threshold.map(|t| t.to_string()).unwrap_or_default(),
                self.run
            );
            Ok(sh(&script))
        }

        fn test_suite(&self) -> anyhow::Result<Option<Vec<CommandSpec>>> {
            Ok(self
                .tests
                .as_ref()
                .map(|steps| steps.iter().map(|s| sh(s)).collect()))
        }
    }

    fn shell(run: &'static str) -> ShellSubmission {
        let root = std::env::temp_dir().join(format!("grader-exec-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).expect("create temp root");
        std::fs::write(root.join("entry"), "").expect("write entry");
        ShellSubmission {
            root,
            compile: None,
            run,
            tests: None,
        }
    }

    fn ctx(root: &Path, timeout_seconds: u64) -> GradingContext {
        let rubric = Rubric::from_json(
            &format!(
                r#"{{"weights": {{"functions": 1, "control_flow": 1, "oop": 1, "file_io": 1,
                "analytics_correctness": 1, "error_handling": 1, "unit_tests": 1}},
                "tolerances": {{"float": 0.01}}, "timeout_seconds": {timeout_seconds}}}"#
            ),
            Path::new("rubric.json"),
        )
        .expect("rubric");
        GradingContext::builder()
            .root(root)
            .rubric(rubric)
            .fixture("fixture.csv")
            .build()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_passes_fixture_and_threshold() {
        let sub = shell("echo \"$INPUT $THRESHOLD\"");
        let outcome = run_program(&sub, &ctx(&sub.root, 10)).await.expect("run");
        assert!(outcome.passed);
        assert_eq!(outcome.logs.trim(), "fixture.csv 100");
        let _ = std::fs::remove_dir_all(&sub.root);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stale_artifacts_are_removed_before_running() {
        let sub = shell("test ! -e summary.json && test ! -e high_value_orders.csv");
        std::fs::write(sub.root.join("summary.json"), "{}").expect("write");
        std::fs::write(sub.root.join("high_value_orders.csv"), "x").expect("write");

        let outcome = run_program(&sub, &ctx(&sub.root, 10)).await.expect("run");
        assert!(outcome.passed);
        let _ = std::fs::remove_dir_all(&sub.root);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_entry_point_is_a_setup_error() {
        let sub = shell("true");
        std::fs::remove_file(sub.root.join("entry")).expect("remove entry");

        let err = run_program(&sub, &ctx(&sub.root, 10))
            .await
            .expect_err("setup error");
        assert!(matches!(err, SubmissionError::MissingEntryPoint(_)));
        assert_eq!(err.to_string(), "entry not found");
        let _ = std::fs::remove_dir_all(&sub.root);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_build_is_an_unsuccessful_run() {
        let mut sub = shell("true");
        sub.compile = Some("echo 'Main.java:3: error' 1>&2; exit 1");

        let outcome = run_program(&sub, &ctx(&sub.root, 10)).await.expect("run");
        assert!(!outcome.passed);
        assert!(outcome.logs.contains("Main.java:3: error"));
        let _ = std::fs::remove_dir_all(&sub.root);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hanging_program_times_out() {
        let sub = shell("sleep 10");
        let err = run_program(&sub, &ctx(&sub.root, 1))
            .await
            .expect_err("timeout");
        assert!(err.to_string().starts_with("Timed out after 1s"));
        let _ = std::fs::remove_dir_all(&sub.root);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probe_passes_on_non_zero_exit() {
        let sub = shell("test -e \"$INPUT\" || exit 1");
        let outcome = probe_error_path(&sub, &ctx(&sub.root, 10)).await;
        assert!(outcome.passed);
        let _ = std::fs::remove_dir_all(&sub.root);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probe_fails_when_program_exits_zero() {
        let sub = shell("echo ignoring missing input");
        let outcome = probe_error_path(&sub, &ctx(&sub.root, 10)).await;
        assert!(!outcome.passed);
        let _ = std::fs::remove_dir_all(&sub.root);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probe_omits_threshold_and_uses_missing_path() {
        let sub = shell("echo \"[$INPUT][$THRESHOLD]\"; exit 2");
        let outcome = probe_error_path(&sub, &ctx(&sub.root, 10)).await;
        assert!(outcome.passed);
        assert_eq!(outcome.logs.trim(), "[__grader_missing__/orders.csv][]");
        let _ = std::fs::remove_dir_all(&sub.root);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probe_fails_on_timeout() {
        let sub = shell("sleep 10");
        let outcome = probe_error_path(&sub, &ctx(&sub.root, 1)).await;
        assert!(!outcome.passed);
        assert!(outcome.logs.contains("Timed out"));
        let _ = std::fs::remove_dir_all(&sub.root);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn no_suite_is_a_vacuous_pass() {
        let sub = shell("true");
        let outcome = run_unit_tests(&sub, &ctx(&sub.root, 10)).await;
        assert_eq!(outcome, StageOutcome::pass(""));
        let _ = std::fs::remove_dir_all(&sub.root);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn suite_stops_at_first_failing_step() {
        let mut sub = shell("true");
        sub.tests = Some(vec!["echo built", "echo '1 failure'; exit 1", "echo never"]);
        let outcome = run_unit_tests(&sub, &ctx(&sub.root, 10)).await;
        assert!(!outcome.passed);
        assert!(outcome.logs.contains("built"));
        assert!(outcome.logs.contains("1 failure"));
        assert!(!outcome.logs.contains("never"));
        let _ = std::fs::remove_dir_all(&sub.root);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn passing_suite_passes() {
        let mut sub = shell("true");
        sub.tests = Some(vec!["echo OK"]);
        let outcome = run_unit_tests(&sub, &ctx(&sub.root, 10)).await;
        assert!(outcome.passed);
        assert_eq!(outcome.logs.trim(), "OK");
        let _ = std::fs::remove_dir_all(&sub.root);
    }

    #[test]
    fn cleaning_an_empty_root_is_fine() {
        let root = std::env::temp_dir().join(format!("grader-clean-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).expect("create temp root");
        clean_artifacts(&root).expect("clean");
        clean_artifacts(&root).expect("clean twice");
        let _ = std::fs::remove_dir_all(root);
    }
}
