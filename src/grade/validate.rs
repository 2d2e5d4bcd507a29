#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Checks the artifacts a submission wrote against the fixture's known
//! results.

use std::{collections::BTreeMap, path::Path};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::constants::{EXPECTED_HEADER, HIGH_VALUE_FILE, SUMMARY_FILE};

/// Issue key → description. Empty means the artifacts are correct.
pub type ValidationIssues = BTreeMap<String, String>;

/// Summary field holding total revenue.
const TOTAL_REVENUE: &str = "total_revenue";
/// Summary field holding the mean order value.
const AVERAGE_ORDER_VALUE: &str = "average_order_value";
/// Summary field mapping category to order count.
const ORDERS_PER_CATEGORY: &str = "orders_per_category";
/// Summary field naming the highest-revenue category.
const TOP_CATEGORY: &str = "top_category_by_revenue";

/// Fields `summary.json` must contain.
const SUMMARY_FIELDS: [&str; 4] =
    [TOTAL_REVENUE, AVERAGE_ORDER_VALUE, ORDERS_PER_CATEGORY, TOP_CATEGORY];

/// Known-correct results for the fixture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpectedResults {
    /// Sum of every order's total.
    pub total_revenue:       f64,
    /// Total revenue divided by order count.
    pub average_order_value: f64,
    /// Orders per category. Extra categories in a submission are tolerated.
    pub orders_per_category: BTreeMap<String, u64>,
    /// Category with the highest revenue, ties broken alphabetically.
    pub top_category:        String,
    /// First line of the high-value CSV.
    pub header:              String,
}

impl Default for ExpectedResults {
    fn default() -> Self {
        Self {
            total_revenue:       303.47,
            average_order_value: 75.87,
            orders_per_category: [("Books", 2), ("Electronics", 1), ("Toys", 1)]
                .into_iter()
                .map(|(name, count)| (name.to_string(), count))
                .collect(),
            top_category:        "Electronics".to_string(),
            header:              EXPECTED_HEADER.to_string(),
        }
    }
}

/// `|a - b| <= tol`.
pub fn approx(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/// Validates both artifacts in `root`, collecting every issue found.
pub fn validate_outputs(root: &Path, tol: f64, expected: &ExpectedResults) -> ValidationIssues {
    let mut issues = ValidationIssues::new();
    check_summary(&root.join(SUMMARY_FILE), tol, expected, &mut issues);
    check_high_value(&root.join(HIGH_VALUE_FILE), expected, &mut issues);
    issues
}

/// Loads `summary.json` as a JSON object, recording why when it can't.
fn load_summary(path: &Path, issues: &mut ValidationIssues) -> Option<Map<String, Value>> {
    if !path.exists() {
        issues.insert(SUMMARY_FILE.into(), "missing".into());
        return None;
    }

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            issues.insert(SUMMARY_FILE.into(), format!("could not be read: {e}"));
            return None;
        }
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Some(map),
        Ok(other) => {
            issues.insert(
                SUMMARY_FILE.into(),
                format!("not valid JSON: expected an object, got {other}"),
            );
            None
        }
        Err(e) => {
            issues.insert(SUMMARY_FILE.into(), format!("not valid JSON: {e}"));
            None
        }
    }
}

/// Structural and value checks for the summary artifact.
fn check_summary(path: &Path, tol: f64, expected: &ExpectedResults, issues: &mut ValidationIssues) {
    let Some(summary) = load_summary(path, issues) else {
        return;
    };

    for key in SUMMARY_FIELDS {
        if !summary.contains_key(key) {
            issues.insert(format!("{SUMMARY_FILE}:{key}"), "missing key".into());
        }
    }

    check_number(&summary, TOTAL_REVENUE, expected.total_revenue, tol, issues);
    check_number(&summary, AVERAGE_ORDER_VALUE, expected.average_order_value, tol, issues);

    if let Some(actual) = summary.get(ORDERS_PER_CATEGORY) {
        let matches = actual.as_object().is_some_and(|counts| {
            expected.orders_per_category.iter().all(|(name, count)| {
                counts.get(name).and_then(Value::as_f64) == Some(*count as f64)
            })
        });
        if !matches {
            let wanted = serde_json::to_string(&expected.orders_per_category)
                .unwrap_or_else(|_| format!("{:?}", expected.orders_per_category));
            issues.insert(
                ORDERS_PER_CATEGORY.into(),
                format!("expected {wanted}, got {actual}"),
            );
        }
    }

    if let Some(actual) = summary.get(TOP_CATEGORY)
        && actual.as_str() != Some(expected.top_category.as_str())
    {
        issues.insert(
            TOP_CATEGORY.into(),
            format!("expected '{}', got {actual}", expected.top_category),
        );
    }
}

/// Records an issue when `key` is present but not a number within `tol` of
/// `expected`.
fn check_number(
    summary: &Map<String, Value>,
    key: &str,
    expected: f64,
    tol: f64,
    issues: &mut ValidationIssues,
) {
    let Some(actual) = summary.get(key) else {
        return;
    };
    let close = actual.as_f64().is_some_and(|n| approx(n, expected, tol));
    if !close {
        issues.insert(key.into(), format!("expected ≈{expected}, got {actual}"));
    }
}

/// Header check for the high-value CSV.
fn check_high_value(path: &Path, expected: &ExpectedResults, issues: &mut ValidationIssues) {
    if !path.exists() {
        issues.insert(HIGH_VALUE_FILE.into(), "missing".into());
        return;
    }

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            issues.insert(HIGH_VALUE_FILE.into(), format!("could not be read: {e}"));
            return;
        }
    };

    let header = text.lines().next().unwrap_or_default().trim();
    if header != expected.header {
        issues.insert(
            format!("{HIGH_VALUE_FILE}:header"),
            format!("expected '{}', got '{header}'", expected.header),
        );
    }
}
