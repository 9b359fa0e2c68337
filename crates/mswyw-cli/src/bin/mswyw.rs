use std::io::{self, Write};
use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use mswyw_cli::error::{EXIT_BELOW_THRESHOLD, EXIT_SUCCESS};
use mswyw_cli::logging::init_tracing;
use mswyw_cli::{RunReport, RunSettings, Runner};

fn main() -> ExitCode {
    let settings = RunSettings::parse();
    init_tracing(settings.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            report_problem(&format!("cannot start runtime: {e}"));
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(async {
        let runner = Runner::from_settings(&settings)?;
        runner.run(&settings, Utc::now()).await
    });

    match outcome {
        Ok(report) => finish(&report, settings.verbose),
        Err(err) => {
            report_problem(&err.to_string());
            ExitCode::from(err.exit_code())
        }
    }
}

fn finish(report: &RunReport, verbose: bool) -> ExitCode {
    if let Err(e) = report.emit(&mut io::stdout().lock(), verbose) {
        report_problem(&format!("cannot write report: {e}"));
        return ExitCode::FAILURE;
    }
    if report.failed_performance {
        ExitCode::from(EXIT_BELOW_THRESHOLD)
    } else {
        ExitCode::from(EXIT_SUCCESS)
    }
}

fn report_problem(message: &str) {
    let _ = writeln!(io::stderr().lock(), "problem: {message}");
}
