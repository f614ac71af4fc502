//! Terminal acknowledgment prompt

use crate::domain::ports::Acknowledger;
use async_trait::async_trait;
use std::io::{BufRead, Write};
use tracing::warn;

/// Interpret an operator's answer; only `y` / `yes` accept
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Asks on stderr and reads one line from stdin
#[derive(Debug, Clone, Default)]
pub struct TerminalAcknowledger;

impl TerminalAcknowledger {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Acknowledger for TerminalAcknowledger {
    async fn acknowledge(&self, prompt: &str) -> bool {
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
            let mut stderr = std::io::stderr().lock();
            write!(stderr, "{} [y/N] ", prompt)?;
            stderr.flush()?;

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_affirmative(&line),
            Ok(Err(e)) => {
                warn!("Failed to read confirmation: {}", e);
                false
            }
            Err(e) => {
                warn!("Confirmation prompt task failed: {}", e);
                false
            }
        }
    }
}
