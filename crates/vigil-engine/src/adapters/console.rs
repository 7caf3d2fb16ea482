//! Console adapter: writes plain report lines to stdout.

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::adapter::{Alert, ChannelAdapter, Delivery};
use crate::commands::CommandDispatch;
use crate::errors::AdapterError;

pub struct ConsoleAdapter {
    name: String,
}

impl ConsoleAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Lines for one delivery, each tagged with its destination
pub fn console_lines(delivery: &Delivery) -> Vec<String> {
    let lines = delivery.plain_lines();
    delivery
        .destinations
        .iter()
        .flat_map(|destination| lines.iter().map(move |line| format!("[{destination}] {line}")))
        .collect()
}

fn alert_lines(alert: &Alert) -> Vec<String> {
    alert
        .destinations
        .iter()
        .map(|destination| format!("[{destination}] {}", alert.text))
        .collect()
}

async fn write_stdout(lines: &[String]) -> Result<(), AdapterError> {
    if lines.is_empty() {
        return Ok(());
    }
    let mut text = lines.join("\n");
    text.push('\n');

    let mut stdout = tokio::io::stdout();
    let written = match stdout.write_all(text.as_bytes()).await {
        Ok(()) => stdout.flush().await,
        Err(err) => Err(err),
    };
    written.map_err(|err| AdapterError::Delivery {
        destination: "stdout".to_string(),
        reason: err.to_string(),
    })
}

#[async_trait]
impl ChannelAdapter for ConsoleAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "console"
    }

    async fn connect(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn serve(&self, _commands: CommandDispatch) -> Result<(), AdapterError> {
        futures::future::pending::<()>().await;
        Ok(())
    }

    async fn deliver(&self, delivery: &Delivery) -> Result<(), AdapterError> {
        write_stdout(&console_lines(delivery)).await
    }

    async fn deliver_alert(&self, alert: &Alert) -> Result<(), AdapterError> {
        write_stdout(&alert_lines(alert)).await
    }

    async fn disconnect(&self) {}
}
