//! CLI channel — stdin/stdout REPL for local testing.
//!
//! A line that parses as a menu action id (e.g. `menu_packages`) is a button
//! press, `/start` is a command, anything else is free text.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse, parse_command};
use crate::error::ChannelError;
use crate::funnel::Action;

/// A simple CLI channel that reads from stdin and writes to stdout.
#[derive(Default)]
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }
}

/// Classify one input line.
fn parse_line(line: &str) -> IncomingMessage {
    if let Some(command) = parse_command(line) {
        return IncomingMessage::command("cli", "local-user", &command);
    }
    if Action::parse(line).is_some() {
        return IncomingMessage::menu_action("cli", "local-user", line);
    }
    IncomingMessage::new("cli", "local-user", line)
}

/// Render a response the way it is printed to the terminal.
fn render(response: &OutgoingResponse) -> String {
    let mut out = response.content.clone();
    if let Some(menu) = &response.menu {
        out.push('\n');
        for button in menu {
            out.push_str(&format!("\n  [{}] {}", button.action_id, button.label));
        }
    }
    out
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        if tx.send(parse_line(line)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        println!("\n{}\n", render(&response));
        eprint!("> ");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
