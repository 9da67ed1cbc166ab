use std::process::ExitCode;

use ba_core::config::Config;
use ba_core::repl;

const USAGE: &str = "\
buildagent - AI-driven minimal Linux build simulator

USAGE:
    buildagent          start the interactive command loop
    buildagent run      run the full pipeline once and export the project

OPTIONS:
    -h, --help          print this help
    -V, --version       print the version
";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "-h" || a == "--help") {
        print!("{USAGE}");
        return ExitCode::SUCCESS;
    }
    if args.iter().any(|a| a == "-V" || a == "--version") {
        println!("buildagent {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let config = match Config::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match args.first().map(String::as_str) {
        Some("run") => {
            let code = runtime.block_on(repl::run_pipeline(&config));
            if code == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Some(other) => {
            eprintln!("error: unknown command '{other}'");
            eprint!("{USAGE}");
            ExitCode::from(2)
        }
        None => match repl::run_repl(&config, runtime.handle()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        },
    }
}
