#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{collections::BTreeMap, fmt::Display};

use anyhow::{Context, Result};
use bon::Builder;
use serde::{Deserialize, Serialize};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Panel, Style, object::Rows},
};

use super::validate::ValidationIssues;
use crate::{config::Weights, constants::PASS_RATIO, submission::Language};

/// The graded checks, in report order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    /// Required functions are defined.
    Functions,
    /// Loops or conditionals are used.
    ControlFlow,
    /// `Order` class with a total method.
    Oop,
    /// Program ran on the fixture and exited zero.
    FileIo,
    /// Artifacts match the fixture's known results.
    AnalyticsCorrectness,
    /// Program fails on a missing input file.
    ErrorHandling,
    /// The submission's own tests pass.
    UnitTests,
}

impl Check {
    /// Every check, in report order.
    pub const ALL: [Check; 7] = [
        Check::Functions,
        Check::ControlFlow,
        Check::Oop,
        Check::FileIo,
        Check::AnalyticsCorrectness,
        Check::ErrorHandling,
        Check::UnitTests,
    ];

    /// Rubric key for this check.
    pub fn name(self) -> &'static str {
        match self {
            Check::Functions => "functions",
            Check::ControlFlow => "control_flow",
            Check::Oop => "oop",
            Check::FileIo => "file_io",
            Check::AnalyticsCorrectness => "analytics_correctness",
            Check::ErrorHandling => "error_handling",
            Check::UnitTests => "unit_tests",
        }
    }
}

impl Display for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one check within a report.
#[derive(Debug, Clone, PartialEq, Serialize, Builder)]
pub struct CheckOutcome {
    /// Whether the check passed.
    pub(crate) pass:   bool,
    /// Points awarded: the full weight on pass, otherwise zero.
    pub(crate) points: u32,
    /// Weight of the check.
    pub(crate) max:    u32,
    /// Validation issues, for the analytics check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) issues: Option<ValidationIssues>,
    /// Tail of captured output, for checks that run something.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) logs:   Option<String>,
}

impl CheckOutcome {
    /// Whether the check passed.
    pub fn passed(&self) -> bool {
        self.pass
    }

    /// Points awarded.
    pub fn points(&self) -> u32 {
        self.points
    }

    /// Weight of the check.
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Validation issues, if this check carries them.
    pub fn issues(&self) -> Option<&ValidationIssues> {
        self.issues.as_ref()
    }

    /// Captured output, if this check carries it.
    pub fn logs(&self) -> Option<&str> {
        self.logs.as_deref()
    }
}

/// Smallest score that passes when `max_score` points are available.
///
/// The threshold is truncated, so `70%` of `15` needs `10` points.
pub fn pass_mark(max_score: u32) -> u32 {
    (PASS_RATIO * f64::from(max_score)) as u32
}

/// Final result of grading one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeReport {
    /// Language the submission was graded as.
    lang:        Language,
    /// Every check's outcome.
    checks:      BTreeMap<Check, CheckOutcome>,
    /// Tail of the program run's output.
    run_logs:    String,
    /// Present when the submission could not be set up for running.
    #[serde(skip_serializing_if = "Option::is_none")]
    setup_error: Option<String>,
    /// Points awarded.
    score:       u32,
    /// Points available.
    max_score:   u32,
    /// Whether `score` reached the pass mark.
    passed:      bool,
}

impl GradeReport {
    /// Language the submission was graded as.
    pub fn lang(&self) -> Language {
        self.lang
    }

    /// Outcome of `check`, if it was recorded.
    pub fn check(&self, check: Check) -> Option<&CheckOutcome> {
        self.checks.get(&check)
    }

    /// Tail of the program run's output.
    pub fn run_logs(&self) -> &str {
        &self.run_logs
    }

    /// Setup problem, if any.
    pub fn setup_error(&self) -> Option<&str> {
        self.setup_error.as_deref()
    }

    /// Points awarded.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Points available.
    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    /// Whether the submission passed.
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Pretty JSON rendering printed on stdout.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Could not serialize grade report")
    }

    /// Human-readable overview table.
    pub fn table(&self) -> String {
        let rows: Vec<CheckRow> = self
            .checks
            .iter()
            .map(|(check, outcome)| CheckRow {
                check:  check.to_string(),
                result: if outcome.pass { "PASS" } else { "FAIL" }.to_string(),
                points: format!("{}/{}", outcome.points, outcome.max),
            })
            .collect();

        Table::new(&rows)
            .with(Panel::header(format!("Grading Overview ({})", self.lang)))
            .with(Panel::footer(format!(
                "Total: {}/{} ({})",
                self.score,
                self.max_score,
                if self.passed { "passed" } else { "not passed" }
            )))
            .with(
                Modify::new(Rows::first())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(
                Modify::new(Rows::last())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(Style::modern())
            .to_string()
    }
}

/// One line of the overview table.
#[derive(Tabled)]
struct CheckRow {
    /// Check name.
    #[tabled(rename = "Check")]
    check:  String,
    /// PASS or FAIL.
    #[tabled(rename = "Result")]
    result: String,
    /// Points awarded out of the weight.
    #[tabled(rename = "Points")]
    points: String,
}

/// Accumulates check outcomes and weighs them into a [`GradeReport`].
#[derive(Debug, Clone)]
pub struct Scorecard {
    /// Rubric weights.
    weights: Weights,
    /// Outcomes recorded so far.
    checks:  BTreeMap<Check, CheckOutcome>,
}

impl Scorecard {
    /// Starts an empty scorecard.
    pub fn new(weights: Weights) -> Self {
        Self {
            weights,
            checks: BTreeMap::new(),
        }
    }

    /// Records `check` as passed or failed, with optional detail.
    pub fn record(
        &mut self,
        check: Check,
        pass: bool,
        issues: Option<ValidationIssues>,
        logs: Option<String>,
    ) {
        let max = self.weights.get(check);
        let outcome = CheckOutcome::builder()
            .pass(pass)
            .points(if pass { max } else { 0 })
            .max(max)
            .maybe_issues(issues)
            .maybe_logs(logs)
            .build();

        if !pass {
            tracing::warn!("Check `{}` failed", check);
        }
        self.checks.insert(check, outcome);
    }

    /// Sums the awarded points and applies the pass mark.
    pub fn finish(
        self,
        lang: Language,
        run_logs: String,
        setup_error: Option<String>,
    ) -> GradeReport {
        let score = self
            .checks
            .values()
            .fold(0u32, |acc, c| acc.saturating_add(c.points));
        let max_score = self.weights.total();

        GradeReport {
            lang,
            checks: self.checks,
            run_logs,
            setup_error,
            score,
            max_score,
            passed: score >= pass_mark(max_score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> Weights {
        Weights {
            functions:             10,
            control_flow:          10,
            oop:                   15,
            file_io:               15,
            analytics_correctness: 30,
            error_handling:        10,
            unit_tests:            10,
        }
    }

    fn card_with(passing: &[Check]) -> GradeReport {
        let mut card = Scorecard::new(weights());
        for check in Check::ALL {
            card.record(check, passing.contains(&check), None, None);
        }
        card.finish(Language::Python, String::new(), None)
    }

    #[test]
    fn pass_mark_truncates() {
        assert_eq!(pass_mark(100), 70);
        assert_eq!(pass_mark(15), 10);
        assert_eq!(pass_mark(0), 0);
    }

    #[test]
    fn score_is_sum_of_passing_weights() {
        let report = card_with(&[Check::Oop, Check::AnalyticsCorrectness]);
        assert_eq!(report.score(), 45);
        assert_eq!(report.max_score(), 100);
        assert!(!report.passed());
        assert_eq!(report.check(Check::Functions).map(|c| c.points()), Some(0));
        assert_eq!(report.check(Check::Oop).map(|c| c.points()), Some(15));
    }

    #[test]
    fn exactly_the_pass_mark_passes() {
        let report = card_with(&[
            Check::Functions,
            Check::ControlFlow,
            Check::FileIo,
            Check::AnalyticsCorrectness,
            Check::ErrorHandling,
        ]);
        assert_eq!(report.score(), 75);
        assert!(report.passed());

        let report = card_with(&[
            Check::Functions,
            Check::Oop,
            Check::FileIo,
            Check::AnalyticsCorrectness,
        ]);
        assert_eq!(report.score(), 70);
        assert!(report.passed());

        let report = card_with(&[
            Check::Functions,
            Check::ControlFlow,
            Check::AnalyticsCorrectness,
            Check::ErrorHandling,
            Check::UnitTests,
        ]);
        assert_eq!(report.score(), 70);
        assert!(report.passed());

        let report = card_with(&[Check::Oop, Check::FileIo, Check::AnalyticsCorrectness]);
        assert_eq!(report.score(), 60);
        assert!(!report.passed());
    }

    #[test]
    fn all_zero_rubric_passes_vacuously() {
        let mut card = Scorecard::new(Weights::default());
        card.record(Check::Functions, false, None, None);
        let report = card.finish(Language::Java, String::new(), None);
        assert_eq!(report.score(), 0);
        assert!(report.passed());
    }

    #[test]
    fn json_lists_checks_in_rubric_order_and_skips_empty_detail() {
        let report = card_with(&Check::ALL);
        let json = report.to_json().expect("json");
        let positions: Vec<usize> = Check::ALL
            .iter()
            .map(|c| json.find(&format!("\"{}\"", c.name())).expect("check key"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(!json.contains("\"issues\""));
        assert!(!json.contains("\"setup_error\""));
        assert!(json.contains("\"lang\": \"python\""));
        assert!(json.contains("\"passed\": true"));
    }

    #[test]
    fn table_mentions_total() {
        let report = card_with(&[Check::Oop]);
        let table = report.table();
        assert!(table.contains("Total: 15/100"));
        assert!(table.contains("FAIL"));
    }
}
