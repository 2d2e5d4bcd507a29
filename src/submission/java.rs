#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use anyhow::{Result, ensure};
use itertools::Itertools;

use super::{Language, StaticChecks, Submission, matches, read_source};
use crate::{
    constants::{JAVA_ENTRY, JAVA_MAIN_CLASS, JAVA_MODEL, JUNIT_JARS, JUNIT_RUNNER},
    process::CommandSpec,
    util::{classpath_separator, find_files, java_path, javac_path},
};

/// Files that identify a Java submission.
pub const MARKERS: [&str; 2] = [JAVA_MODEL, JAVA_ENTRY];

/// Declarations or calls of any of these count as the required methods.
const FUNCTION_PATTERN: &str = r"\b(aggregate|filterHighValue|parseArgs)\s*\(";

/// Any loop or conditional keyword followed by its parenthesis.
const CONTROL_FLOW_PATTERN: &str = r"\b(for|while|if)\s*\(";

/// A Java submission rooted at a directory. Sources live directly in the
/// root, in the default package.
#[derive(Debug, Clone)]
pub struct JavaSubmission {
    /// Submission root.
    root: PathBuf,
}

/// Whether a source file name looks like a JUnit test class.
fn is_test_source(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with("test.java")
}

impl JavaSubmission {
    /// Views `root` as a Java submission.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File names of every `.java` source in the root, sorted.
    fn sources(&self) -> Result<Vec<String>> {
        Ok(find_files("java", 0, &self.root)?
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect())
    }

    /// Class path used for compiling and running the test suite.
    fn test_classpath(&self) -> String {
        std::iter::once(".")
            .chain(JUNIT_JARS)
            .join(classpath_separator())
    }
}

impl Submission for JavaSubmission {
    fn language(&self) -> Language {
        Language::Java
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn entry_point(&self) -> PathBuf {
        self.root.join(JAVA_ENTRY)
    }

    fn static_checks(&self) -> StaticChecks {
        let mut checks = StaticChecks::default();

        if let Some(src) = read_source(&self.root, JAVA_ENTRY) {
            checks.functions = matches(FUNCTION_PATTERN, &src);
            checks.control_flow = matches(CONTROL_FLOW_PATTERN, &src);
        }
        if let Some(model) = read_source(&self.root, JAVA_MODEL) {
            checks.oop = model.contains("class Order") && model.contains("total(");
        }

        checks
    }

    /// Compiles every non-test source, so a test class that needs JUnit does
    /// not break the program build.
    fn compile_command(&self) -> Result<Option<CommandSpec>> {
        let sources: Vec<String> = self
            .sources()?
            .into_iter()
            .filter(|name| !is_test_source(name))
            .collect();
        ensure!(!sources.is_empty(), "No Java sources found in {}", self.root.display());

        Ok(Some(CommandSpec::new(javac_path()?).args(sources)))
    }

    fn run_command(&self, input: &Path, threshold: Option<f64>) -> Result<CommandSpec> {
        let mut cmd = CommandSpec::new(java_path()?)
            .args(["-cp", "."])
            .arg(JAVA_MAIN_CLASS)
            .arg("--input")
            .arg(input.as_os_str());
        if let Some(t) = threshold {
            cmd = cmd.arg("--threshold").arg(t.to_string());
        }
        Ok(cmd)
    }

    fn test_suite(&self) -> Result<Option<Vec<CommandSpec>>> {
        let sources = self.sources()?;
        let test_classes: Vec<String> = sources
            .iter()
            .filter(|name| is_test_source(name))
            .map(|name| name.trim_end_matches(".java").to_string())
            .collect();
        if test_classes.is_empty() {
            return Ok(None);
        }

        let classpath = self.test_classpath();
        let compile = CommandSpec::new(javac_path()?)
            .args(["-cp", classpath.as_str()])
            .args(sources);
        let run = CommandSpec::new(java_path()?)
            .args(["-cp", classpath.as_str(), JUNIT_RUNNER])
            .args(test_classes);

        Ok(Some(vec![compile, run]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(files: &[(&str, &str)]) -> JavaSubmission {
        let root = std::env::temp_dir().join(format!("grader-java-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).expect("create temp root");
        for (name, body) in files {
            std::fs::write(root.join(name), body).expect("write source");
        }
        JavaSubmission::new(root)
    }

    #[test]
    fn detects_methods_loops_and_order_total() {
        let sub = submission(&[
            (
                "OrderProcessor.java",
                "public class OrderProcessor {\n  static Map<String, Object> aggregate(List<Order> \
                 orders) {\n    for (Order o : orders) {}\n  }\n}\n",
            ),
            (
                "Order.java",
                "public class Order {\n  public BigDecimal total() { return price; }\n}\n",
            ),
        ]);
        let checks = sub.static_checks();
        assert!(checks.functions);
        assert!(checks.control_flow);
        assert!(checks.oop);
        let _ = std::fs::remove_dir_all(sub.root());
    }

    #[test]
    fn identifiers_containing_keywords_are_not_control_flow() {
        let sub = submission(&[(
            "OrderProcessor.java",
            "public class OrderProcessor { void format(int notify) { verify(notify); } }",
        )]);
        let checks = sub.static_checks();
        assert!(!checks.control_flow);
        assert!(!checks.functions);
        let _ = std::fs::remove_dir_all(sub.root());
    }

    #[test]
    fn absent_sources_fail_every_check() {
        let sub = submission(&[]);
        assert_eq!(sub.static_checks(), StaticChecks::default());
        let _ = std::fs::remove_dir_all(sub.root());
    }

    #[test]
    fn test_sources_are_recognised_case_insensitively() {
        assert!(is_test_source("OrderTest.java"));
        assert!(is_test_source("ordertest.java"));
        assert!(!is_test_source("OrderProcessor.java"));
        assert!(!is_test_source("Testing.java"));
    }

    #[test]
    fn no_test_class_means_no_suite() {
        let sub = submission(&[("Order.java", ""), ("OrderProcessor.java", "")]);
        assert!(sub.test_suite().expect("suite").is_none());
        let _ = std::fs::remove_dir_all(sub.root());
    }

    #[test]
    fn test_classpath_lists_junit_jars() {
        let sub = JavaSubmission::new("/work");
        let sep = classpath_separator();
        assert_eq!(
            sub.test_classpath(),
            format!(".{sep}junit-4.13.2.jar{sep}hamcrest-core-1.3.jar")
        );
    }
}
