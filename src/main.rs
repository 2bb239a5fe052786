use clap::Parser;
use hype::cli::{generate_completions, Args, Commands};
use hype::config::AppConfig;
use hype::diagnostic::render_diagnostics;
use hype::interpreter::{check_source, run_source, Interpreter, RunError};
use hype::scanner::scan;
use hype::token::TokenKind;
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const EXIT_SYNTAX: u8 = 65;
const EXIT_RUNTIME: u8 = 70;
const EXIT_IO: u8 = 74;

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(Commands::Complete { shell }) = args.command {
        generate_completions(shell);
        return ExitCode::SUCCESS;
    }

    let config = AppConfig::from_args(&args);
    init_tracing(&config);

    if let Some(source) = &args.eval {
        return run_program(source, "<eval>", &config);
    }

    match &args.file {
        Some(path) => run_file(path, &config),
        None => run_repl(&config),
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_env("HYPE_LOG").unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true)
                .with_ansi(config.color_enabled),
        )
        .with(filter)
        .try_init();
}

fn run_file(path: &Path, config: &AppConfig) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            error_message(config, &format!("Failed to read {}: {}", path.display(), e));
            return ExitCode::from(EXIT_IO);
        }
    };
    debug!(path = %path.display(), bytes = source.len(), "read script");
    run_program(&source, &path.display().to_string(), config)
}

fn run_program(source: &str, name: &str, config: &AppConfig) -> ExitCode {
    let result = if config.check_only {
        check_source(source).map(|statements| info!(statements = statements.len(), "no syntax errors"))
    } else {
        let mut interpreter = Interpreter::new();
        run_source(source, &mut interpreter)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(source, name, &error, config);
            exit_code(&error)
        }
    }
}

fn run_repl(config: &AppConfig) -> ExitCode {
    let interactive = atty::is(atty::Stream::Stdin);
    if interactive {
        println!("hype {} interactive session", env!("CARGO_PKG_VERSION"));
        println!("Exit with Ctrl+D (Ctrl+Z on Windows) or type 'exit'.");
        println!();
    }

    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut buffer = String::new();

    loop {
        if interactive {
            print!("{}", if buffer.is_empty() { "> " } else { "... " });
            let _ = io::stdout().flush();
        }

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                error_message(config, &format!("Error reading input: {}", e));
                return ExitCode::from(EXIT_IO);
            }
            None => break,
        };

        if buffer.is_empty() && matches!(line.trim(), "exit" | "quit") {
            break;
        }

        buffer.push_str(&line);
        buffer.push('\n');
        if open_delimiters(&buffer) > 0 {
            continue;
        }

        let chunk = std::mem::take(&mut buffer);
        if let Err(error) = run_source(&chunk, &mut interpreter) {
            report(&chunk, "<repl>", &error, config);
        }
    }

    ExitCode::SUCCESS
}

/// How many brackets in `source` are still waiting to be closed.
fn open_delimiters(source: &str) -> usize {
    let mut depth: usize = 0;
    for token in scan(source).tokens {
        match token.kind {
            TokenKind::LeftParen | TokenKind::LeftBrace | TokenKind::LeftBracket => depth += 1,
            TokenKind::RightParen | TokenKind::RightBrace | TokenKind::RightBracket => {
                depth = depth.saturating_sub(1)
            }
            _ => {}
        }
    }
    depth
}

fn report(source: &str, name: &str, error: &RunError, config: &AppConfig) {
    let rendered = render_diagnostics(source, name, &error.to_diagnostics(), config.color_enabled);
    eprint!("{}", rendered);
}

fn exit_code(error: &RunError) -> ExitCode {
    match error {
        RunError::Syntax { .. } => ExitCode::from(EXIT_SYNTAX),
        RunError::Runtime(_) => ExitCode::from(EXIT_RUNTIME),
    }
}

fn error_message(config: &AppConfig, message: &str) {
    if config.color_enabled {
        eprintln!("{}", message.red().bold());
    } else {
        eprintln!("{}", message);
    }
}
