use std::process::ExitCode;

use clap::Parser;
use spannet_cli::{CliArgs, SpannetApp};

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let result = SpannetApp::from_args(&args).and_then(|app| app.run(args));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
