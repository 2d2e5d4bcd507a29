#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Structured summary a submission must write.
pub const SUMMARY_FILE: &str = "summary.json";

/// High-value order list a submission must write.
pub const HIGH_VALUE_FILE: &str = "high_value_orders.csv";

/// Every artifact removed before a program run.
pub const ARTIFACTS: [&str; 2] = [SUMMARY_FILE, HIGH_VALUE_FILE];

/// Column order shared by the fixture and the high-value CSV.
pub const EXPECTED_HEADER: &str = "order_id,customer_id,category,unit_price,quantity,timestamp";

/// Fixture handed to the program, relative to the submission root.
pub const DEFAULT_FIXTURE: &str = "autograder/fixtures/orders.csv";

/// Rubric location relative to the submission root.
pub const RUBRIC_FILE: &str = "autograder/rubric.json";

/// Environment variable that overrides the rubric location.
pub const RUBRIC_ENV: &str = "GRADER_RUBRIC";

/// `timeout_seconds` when the rubric omits it.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// High-value threshold passed with `--threshold`.
pub const DEFAULT_THRESHOLD: f64 = 100.0;

/// Input path used by the error-path probe; must not exist.
pub const MISSING_INPUT: &str = "__grader_missing__/orders.csv";

/// Longest tail of captured output kept in the report.
pub const LOG_TAIL: usize = 4000;

/// Fraction of the maximum score needed to pass.
pub const PASS_RATIO: f64 = 0.7;

/// Python entry point.
pub const PYTHON_ENTRY: &str = "process_orders.py";

/// Python module holding the `Order` class.
pub const PYTHON_MODELS: &str = "models.py";

/// Python test suite directory.
pub const PYTHON_TEST_DIR: &str = "tests";

/// Java entry point source.
pub const JAVA_ENTRY: &str = "OrderProcessor.java";

/// Java main class.
pub const JAVA_MAIN_CLASS: &str = "OrderProcessor";

/// Java source holding the `Order` class.
pub const JAVA_MODEL: &str = "Order.java";

/// Jars that must sit in the submission root for JUnit suites.
pub const JUNIT_JARS: [&str; 2] = ["junit-4.13.2.jar", "hamcrest-core-1.3.jar"];

/// JUnit 4 console runner.
pub const JUNIT_RUNNER: &str = "org.junit.runner.JUnitCore";
