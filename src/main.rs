use segroute::cli::run_cli;
use segroute::logging::{init_logging, LogConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    // Logs go to stderr so command output on stdout stays parseable
    let _guard = match init_logging(&LogConfig::from_env()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("warning: logging disabled: {e:#}");
            None
        }
    };

    match run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
