//! Dlq command handler

use crate::config::settings::Settings;
use crate::error::AppResult;
use crate::jobs::types::Message;
use crate::worker::build_queue;

/// Handler for the dlq command
pub struct DlqCommandHandler {
    config: Settings,
}

impl DlqCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Print up to `limit` dead-lettered messages, oldest first, as a JSON array.
    pub async fn execute(&self, limit: usize) -> AppResult<Vec<Message>> {
        let queue = build_queue(&self.config, None).await?;
        let entries = queue.read_dlq(limit).await?;

        tracing::debug!(count = entries.len(), limit, "Read dead-letter entries");
        println!("{}", render(&entries)?);
        Ok(entries)
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}

fn render(entries: &[Message]) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(entries).map_err(anyhow::Error::from)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::Payload;

    #[tokio::test]
    async fn test_execute_on_empty_dead_letter_list() {
        let handler = DlqCommandHandler::new(Settings::default());
        assert!(handler.execute(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_limit() {
        let handler = DlqCommandHandler::new(Settings::default());
        assert!(handler.execute(0).await.unwrap().is_empty());
    }

    #[test]
    fn test_render_keeps_last_error() {
        let mut message = Message::new("email_send", Payload::new(), 5);
        message.attempts = 5;
        message.last_error = "smtp down".to_string();

        let rendered = render(&[message]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(parsed[0]["job"], "email_send");
        assert_eq!(parsed[0]["attempts"], 5);
        assert_eq!(parsed[0]["last_error"], "smtp down");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[]).unwrap(), "[]");
    }
}
