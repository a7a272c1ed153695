//! Interactive chat command with conversation memory.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
///
/// Each answer is grounded in the indexed documents and the exchange is
/// recorded in the session's conversation memory, so follow-up questions
/// can refer back to earlier ones.
pub async fn run_chat(model: Option<String>, mut settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.rag.model = model;
    }

    let pipeline = Pipeline::new(settings)?;

    println!("\n{}", style("Lese Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset memory, 'memory' to inspect it.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            pipeline.memory_clear()?;
            Output::info("Conversation memory cleared.");
            continue;
        }

        if input.eq_ignore_ascii_case("memory") {
            let summary = pipeline.memory_summary()?;
            Output::kv("Exchanges", &summary.total_exchanges.to_string());
            Output::kv("At capacity", &summary.memory_full.to_string());
            if let Some(at) = summary.latest_exchange_at {
                Output::kv("Latest", &at.to_rfc3339());
            }
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        match pipeline.ask(input).await {
            Ok(result) => {
                spinner.finish_and_clear();
                println!("\n{} {}\n", style("Lese:").cyan().bold(), result.answer);
                if !result.sources.is_empty() {
                    println!(
                        "{}\n",
                        style(format!("Sources: {}", result.sources.join(", "))).dim()
                    );
                }
            }
            Err(e) => {
                spinner.finish_and_clear();
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
