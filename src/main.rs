#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # order-grader
//!
//! Command line entry point. Prints a JSON grade report on stdout and exits
//! with `0` when the submission passed, `1` when it did not, and `2` when its
//! language could not be determined.

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use order_grader::{
    GradingContext, Language, Rubric,
    config::rubric_path,
    constants::{DEFAULT_FIXTURE, DEFAULT_THRESHOLD},
    detect_language, grade_submission,
};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Exit status when no language could be detected.
const EXIT_UNDETERMINED: u8 = 2;

/// Parsed command line.
#[derive(Debug, Clone)]
struct Options {
    /// Language override; detected from marker files when absent.
    lang:      Option<Language>,
    /// Submission root.
    dir:       PathBuf,
    /// Rubric file override.
    rubric:    Option<PathBuf>,
    /// Fixture CSV handed to the program.
    fixture:   PathBuf,
    /// High-value threshold handed to the program.
    threshold: f64,
    /// Print an overview table on stderr.
    table:     bool,
    /// Debug logging.
    verbose:   bool,
}

/// Parse the command line arguments into [`Options`]
fn options() -> Options {
    let lang = long("lang")
        .help("Submission language: python or java (detected when omitted)")
        .argument::<Language>("LANG")
        .optional();

    let dir = long("dir")
        .help("Submission directory")
        .argument::<PathBuf>("DIR")
        .fallback(PathBuf::from("."));

    let rubric = long("rubric")
        .help("Rubric JSON (defaults to $GRADER_RUBRIC, then autograder/rubric.json)")
        .argument::<PathBuf>("PATH")
        .optional();

    let fixture = long("fixture")
        .help("Fixture CSV, relative to the submission directory")
        .argument::<PathBuf>("PATH")
        .fallback(PathBuf::from(DEFAULT_FIXTURE));

    let threshold = long("threshold")
        .help("High-value order threshold passed to the program")
        .argument::<f64>("AMOUNT")
        .fallback(DEFAULT_THRESHOLD);

    let table = long("table")
        .help("Also print an overview table on stderr")
        .switch();

    let verbose = short('v')
        .long("verbose")
        .help("Log every command that is run")
        .switch();

    construct!(Options {
        lang,
        dir,
        rubric,
        fixture,
        threshold,
        table,
        verbose
    })
    .to_options()
    .descr("Autograder for the retail-order analytics assignment")
    .run()
}

/// Loads configuration, grades, prints the report, and picks the exit code.
async fn run(opts: Options) -> Result<ExitCode> {
    let root = std::fs::canonicalize(&opts.dir)
        .with_context(|| format!("Submission directory {} not found", opts.dir.display()))?;

    let rubric_file = rubric_path(opts.rubric.clone(), &root);
    let rubric = Rubric::load(&rubric_file)?;
    tracing::info!(
        "Loaded rubric from {} (max {} points)",
        rubric_file.display(),
        rubric.max_score()
    );

    let Some(lang) = opts.lang.or_else(|| detect_language(&root)) else {
        tracing::error!("No Python or Java marker files in {}", root.display());
        println!(
            "{}",
            serde_json::json!({ "error": "Could not detect language; missing expected files." })
        );
        return Ok(ExitCode::from(EXIT_UNDETERMINED));
    };
    tracing::info!("Grading as {}", lang);

    let ctx = GradingContext::builder()
        .root(root)
        .rubric(rubric)
        .fixture(opts.fixture)
        .threshold(opts.threshold)
        .build();

    let report = grade_submission(lang, &ctx).await;
    println!("{}", report.to_json()?);

    if opts.table {
        eprintln!("{}", report.table());
        let verdict = if report.passed() {
            "PASSED".green().bold()
        } else {
            "NOT PASSED".red().bold()
        };
        eprintln!("{verdict}");
    }

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    let opts = options();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);
    let filter_layer = LevelFilter::from_level(if opts.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    });
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    match run(opts).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
