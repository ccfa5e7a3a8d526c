mod debug_report;

use doolittle::{FAREWELL, GREETING, Session};
use std::io::{self, BufRead, IsTerminal, Write};

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let mut session = match load_session(config.script.as_deref()) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match &config.input {
        Some(input) => respond_once(&mut session, input, &config),
        None => converse(&mut session, &config),
    }
}

fn load_session(script: Option<&str>) -> Result<Session, String> {
    let Some(path) = script else {
        return Ok(Session::doctor());
    };
    let text = std::fs::read_to_string(path).map_err(|err| format!("error: cannot read '{path}': {err}"))?;
    Session::from_script(&text).map_err(|err| format!("error: invalid rule script '{path}': {err}"))
}

/// Answer a single input and exit, for scripting and quick checks.
fn respond_once(session: &mut Session, input: &str, config: &CliConfig) {
    if session.is_quit(input) {
        println!("{FAREWELL}");
        return;
    }
    print_reply(session, input, config);
}

fn converse(session: &mut Session, config: &CliConfig) {
    println!("{GREETING}");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        // EOF ends the conversation like a quit phrase would.
        let Some(next) = lines.next() else {
            println!("{FAREWELL}");
            break;
        };
        let line = match next {
            Ok(line) => line,
            Err(err) => {
                eprintln!("error: failed to read stdin: {err}");
                std::process::exit(1);
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if session.is_quit(input) {
            println!("{FAREWELL}");
            break;
        }
        print_reply(session, input, config);
    }
}

fn print_reply(session: &mut Session, input: &str, config: &CliConfig) {
    if config.trace {
        let reply = session.respond_verbose(input);
        debug_report::print_turn(input, &reply.details, config.color);
        println!("{}", reply.response);
    } else {
        println!("{}", session.respond(input).response);
    }
}

struct CliConfig {
    script: Option<String>,
    input: Option<String>,
    trace: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut script: Option<String> = None;
    let mut input: Option<String> = None;
    let mut trace = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("doolittle {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--trace" => trace = true,
            "--script" | "-s" => {
                let value = args.next().ok_or_else(|| "error: --script expects a path".to_string())?;
                script = Some(value);
            }
            "--input" | "-i" => {
                let value = args.next().ok_or_else(|| "error: --input expects a value".to_string())?;
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(value);
            }
            "--" => {
                let rest = args.collect::<Vec<_>>().join(" ");
                if !rest.trim().is_empty() {
                    if input.is_some() {
                        return Err("error: input provided multiple times".to_string());
                    }
                    input = Some(rest);
                }
                break;
            }
            _ if arg.starts_with("--script=") => {
                script = Some(arg.trim_start_matches("--script=").to_string());
            }
            _ if arg.starts_with("--input=") => {
                let value = arg.trim_start_matches("--input=");
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(value.to_string());
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                let rest = std::iter::once(arg).chain(args).collect::<Vec<_>>().join(" ");
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(rest);
                break;
            }
        }
    }

    Ok(CliConfig { script, input, trace, color })
}

fn help_text() -> String {
    format!(
        "doolittle {version}

Rule-driven conversational response generator (an ELIZA-style doctor).

Usage:
  doolittle [OPTIONS]                    Hold a conversation on stdin/stdout.
  doolittle [OPTIONS] [--] <input...>    Answer a single input and exit.
  doolittle [OPTIONS] --input <text>     Same, via flag.

Options:
  -i, --input <text>     Input to answer once instead of conversing.
  -s, --script <path>    Rule script to load instead of the built-in doctor.
  --trace                Print a per-turn report (keywords, matches, selection).
  --color                Force ANSI color output.
  --no-color             Disable ANSI color output.
  -h, --help             Show this help message.
  -V, --version          Print version information.

Exit codes:
  0  Success.
  1  Script load failure or I/O error.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION")
    )
}
