//! Terminal chat client: entry point.
//!
//! Connects to a chat server, answers the username prompt, prints every
//! incoming line, and forwards what the user types.
//!
//! # Usage
//!
//! ```text
//! chat-client --username <NAME> [--host <HOST>] [--port <PORT>]
//! ```
//!
//! While connected:
//!
//! - plain text is broadcast to everyone
//! - `/private <username> <message>` goes to one user
//! - `/image <path>` uploads a local file (at most 10 MiB)
//! - end of input (Ctrl+D) disconnects
//!
//! Log output goes to stderr so it does not mix with the conversation.

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chat_client::application::{parse_input, render_line, Outgoing};
use chat_client::infrastructure::{
    connect, spawn_reader, ConnectionEvent, PreparedUpload, ServerWriter,
};
use chat_core::ServerLine;

/// Terminal client for the line-chat server.
#[derive(Debug, Parser)]
#[command(
    name = "chat-client",
    about = "Terminal client for the line-chat server",
    version
)]
struct Cli {
    /// Server hostname or IP address.
    #[arg(long, default_value = "127.0.0.1", env = "CHAT_HOST")]
    host: String,

    /// Server TCP port.
    #[arg(long, default_value_t = chat_core::DEFAULT_PORT, env = "CHAT_PORT")]
    port: u16,

    /// Display name sent in answer to the server's prompt.
    #[arg(long, env = "CHAT_USERNAME")]
    username: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let (read_half, write_half) = connect(&cli.host, cli.port)
        .await
        .with_context(|| format!("could not reach chat server at {}:{}", cli.host, cli.port))?;
    info!("connected to {}:{}", cli.host, cli.port);

    let mut events = spawn_reader(read_half);
    let mut writer = ServerWriter::new(write_half);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ConnectionEvent::Line(ServerLine::Prompt)) => {
                    writer.send_line(&cli.username).await?;
                }
                Some(ConnectionEvent::Line(line)) => {
                    if let Some(text) = render_line(&line, &cli.username) {
                        println!("{text}");
                    }
                }
                Some(ConnectionEvent::Closed) | None => {
                    println!("Disconnected from server.");
                    break;
                }
            },
            input = stdin.next_line(), if stdin_open => {
                let Some(line) = input.context("failed to read standard input")? else {
                    // Keep printing until the server closes our session.
                    stdin_open = false;
                    writer.shutdown().await?;
                    continue;
                };
                match parse_input(&line) {
                    None => {}
                    Some(Outgoing::Line(text)) => writer.send_line(&text).await?,
                    Some(Outgoing::Upload(path)) => upload(&mut writer, &path).await?,
                }
            }
        }
    }

    Ok(())
}

/// Uploads `path`.  Local problems are reported and the session continues;
/// a failure after the header went out ends the session, because the
/// server can no longer frame the stream.
async fn upload<W>(writer: &mut ServerWriter<W>, path: &std::path::Path) -> anyhow::Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let prepared = match PreparedUpload::prepare(path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Upload refused: {e}");
            return Ok(());
        }
    };
    match writer.send_upload(&prepared).await {
        Ok(sent) => {
            info!("uploaded {} ({sent} bytes)", prepared.descriptor().filename);
            Ok(())
        }
        Err(e) if e.breaks_framing() => {
            Err(e).context("upload interrupted; the stream can no longer be framed")
        }
        Err(e) => {
            // Nothing was sent yet.
            warn!("upload of {} failed: {e}", path.display());
            eprintln!("Upload failed: {e}");
            Ok(())
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["chat-client", "--username", "alice"]);
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 12345);
        assert_eq!(cli.username, "alice");
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "chat-client",
            "--host",
            "chat.example.org",
            "--port",
            "4000",
            "--username",
            "bob",
        ]);
        assert_eq!(cli.host, "chat.example.org");
        assert_eq!(cli.port, 4000);
    }

    #[test]
    fn test_cli_requires_username() {
        let result = Cli::try_parse_from(["chat-client"]);
        assert!(result.is_err());
    }
}
