//! brewbump CLI entry point.

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use brewbump::cli::{self, EXIT_FAILURE, EXIT_OK, OkEnvelope, exit_code_for, render_error};
use brewbump::report::{format_unified_diff, render_text};
use brewbump::tracing::{TracingConfig, init_tracing};
use brewbump::{UpdateReport, Updater};
use brewbump_github::GitHubWebSource;

fn main() {
    // NOTE: eprintln! in the panic hook is intentional; the subscriber may be unusable mid-panic.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    let tracing_config = TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
        filter: None,
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("{e:?}");
        std::process::exit(EXIT_FAILURE);
    }

    let result = GitHubWebSource::new(cli.source_config())
        .and_then(|source| Updater::new(&source).run(&cli.request()));

    let code = match result {
        Ok(report) => {
            print_report(&report, cli.json);
            EXIT_OK
        }
        Err(err) => {
            let code = exit_code_for(&err);
            render_error(err, cli.json);
            code
        }
    };
    std::process::exit(code);
}

fn print_report(report: &UpdateReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(&OkEnvelope::new(report)) {
            Ok(out) => println!("{out}"),
            Err(e) => eprintln!("Error serializing report: {e}"),
        }
        return;
    }

    if report.dry_run {
        let path = report.formula.display().to_string();
        print!("{}", format_unified_diff(&path, &report.original, &report.patched));
    }
    print!("{}", render_text(report));
}
