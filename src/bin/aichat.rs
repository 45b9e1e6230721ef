//! Command-line shell over the secretary.
//!
//! One instruction per line. Append ` || <feedback>` to pass feedback on an earlier answer,
//! e.g. `discuss sorting large files || rating: 3/5`. `create file <name> <content>` and
//! `read file <name>` work on `data/scripts/` directly and take the rest of the line verbatim. `exit` or end of input quits.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use aichat::commands::Passthrough;
use aichat::config::AiChatConfig;
use aichat::SecretaryCoordinator;

const FEEDBACK_SEPARATOR: &str = " || ";

/// Separate `<instruction> || <feedback>`. Passthrough commands carry no feedback, so their
/// content keeps any `||` it contains.
fn split_feedback(line: &str) -> (&str, Option<&str>) {
    let line = line.trim_end_matches(['\n', '\r']);
    if Passthrough::parse(line.trim_start()).is_some() {
        return (line.trim_start(), None);
    }
    match line.split_once(FEEDBACK_SEPARATOR) {
        Some((instruction, feedback)) if !feedback.trim().is_empty() => {
            (instruction.trim(), Some(feedback.trim()))
        }
        Some((instruction, _)) => (instruction.trim(), None),
        None => (line.trim(), None),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    aichat::init_logger();

    let config = match AiChatConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Set XAI_API_KEY (secretary) and OPENAI_API_KEY (discussion group).");
            return ExitCode::FAILURE;
        }
    };
    let secretary = match SecretaryCoordinator::from_config(&config) {
        Ok(secretary) => secretary,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("=== aichat ===");
    println!(
        "Secretary: {} | discussion group: {}",
        secretary.planner().model_name(),
        secretary
            .orchestrator()
            .list_agents()
            .iter()
            .map(|agent| agent.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Type an instruction (optionally `<instruction> || <feedback>`), or `exit`.");

    let stdin = io::stdin();
    loop {
        print!("\n> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Could not read input: {}", e);
                return ExitCode::FAILURE;
            }
        }

        let (instruction, feedback) = split_feedback(&line);
        if instruction.eq_ignore_ascii_case("exit") || instruction.eq_ignore_ascii_case("quit") {
            break;
        }
        if instruction.is_empty() {
            continue;
        }

        match secretary.handle(instruction, feedback).await {
            Ok(result) => println!("{}", result.result_text),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    ExitCode::SUCCESS
}
