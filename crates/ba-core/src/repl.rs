//! Interactive command loop.
//!
//! Reads commands line-by-line from stdin; each backend-driven command runs
//! to completion on the runtime before the next prompt is shown.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use ba_backend::GeminiClient;

use crate::config::Config;
use crate::output::BuildOutput;
use crate::session::BuildSession;

const PROMPT: &str = "build> ";

fn print_command_help() {
    println!("commands:");
    println!("  generate        generate the project files");
    println!("  setup           simulate scripts/setup.sh");
    println!("  build           simulate scripts/build.sh (with fix-on-failure)");
    println!("  test            simulate scripts/test.sh");
    println!("  run             run all four steps in order");
    println!("  status          show pipeline step status");
    println!("  files           list generated files");
    println!("  show <file>     print one generated file");
    println!("  export [dir]    write generated files to disk");
    println!("  quit            exit");
}

fn new_session(config: &Config) -> io::Result<BuildSession<io::Stdout>> {
    let api_key = config.backend.gemini.resolve_api_key()?;
    let client = GeminiClient::with_model(api_key, config.backend.gemini.model.clone());
    let output = BuildOutput::new(io::stdout(), io::stdout().is_terminal());
    Ok(BuildSession::new(client, output))
}

/// Run the interactive loop until `quit` or EOF.
pub fn run_repl(config: &Config, handle: &tokio::runtime::Handle) -> io::Result<()> {
    let mut session = new_session(config)?;
    println!("buildagent: AI-driven minimal Linux build. Type 'help' for commands.");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("{PROMPT}");
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };
        match command {
            "help" | "?" => print_command_help(),
            "generate" => {
                handle.block_on(session.generate_files());
            }
            "setup" => {
                handle.block_on(session.run_setup());
            }
            "build" => {
                handle.block_on(session.run_build());
            }
            "test" => {
                handle.block_on(session.run_test());
            }
            "run" => {
                handle.block_on(session.run_all());
            }
            "status" => session.show_status(),
            "files" => session.show_files(),
            "show" => match parts.next() {
                Some(name) => session.show_file(name),
                None => println!("usage: show <file>"),
            },
            "export" => {
                let dir = parts
                    .next()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| config.project.resolve_export_dir());
                session.export(&dir);
            }
            "quit" | "exit" | "q" => break,
            other => println!("unknown command: {other} (try 'help')"),
        }
    }
    Ok(())
}

/// Non-interactive mode: run the whole pipeline once and return an exit code.
pub async fn run_pipeline(config: &Config) -> i32 {
    let mut session = match new_session(config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    let ok = session.run_all().await;
    if ok {
        let dir = config.project.resolve_export_dir();
        session.export(&dir);
        0
    } else {
        session.show_status();
        1
    }
}
