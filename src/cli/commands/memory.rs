//! Memory command implementation.
//!
//! The conversation log is persisted under the data directory, so these
//! operations act on the same log that `ask`, `chat`, and `serve` append to.

use crate::cli::{MemoryAction, Output};
use crate::config::Settings;
use crate::memory::Exchange;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Run the memory command.
pub async fn run_memory(action: &MemoryAction, settings: Settings) -> Result<()> {
    let pipeline = Pipeline::new(settings)?;

    match action {
        MemoryAction::Show => {
            let exchanges = pipeline.memory_all()?;
            print_exchanges(&exchanges, "No exchanges recorded yet.");
        }

        MemoryAction::Recent { n } => {
            let exchanges = pipeline.memory_recent(*n)?;
            print_exchanges(&exchanges, "No exchanges recorded yet.");
        }

        MemoryAction::Search { query } => {
            let exchanges = pipeline.memory_search(query)?;
            print_exchanges(&exchanges, "No exchanges matched your query.");
        }

        MemoryAction::Clear => {
            pipeline.memory_clear()?;
            Output::success("Conversation memory cleared.");
        }
    }

    Ok(())
}

fn print_exchanges(exchanges: &[Exchange], empty_msg: &str) {
    if exchanges.is_empty() {
        Output::info(empty_msg);
        return;
    }

    for ex in exchanges {
        Output::exchange(
            &ex.question,
            &ex.answer,
            &ex.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
    }
    println!();
    Output::kv("Total", &exchanges.len().to_string());
}
