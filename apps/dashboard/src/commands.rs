//! Operator commands read from stdin.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use rover_api::{Client, Snapshot};

/// A parsed operator command.
#[derive(Debug, PartialEq)]
pub enum Command {
    /// Capture a camera frame and save it.
    Snapshot,
    /// Dispatch a command over the XBee radio.
    Send(String),
    /// Re-render the current state.
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let cmd = match word {
            "snapshot" | "snap" => Self::Snapshot,
            "send" | "xbee" => {
                if rest.is_empty() {
                    return Err("usage: send <command>".into());
                }
                Self::Send(rest.to_owned())
            }
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("unknown command '{other}', try 'help'")),
        };
        Ok(Some(cmd))
    }
}

pub const HELP: &str = "\
commands:
  snapshot         capture a camera frame
  send <command>   send a command over XBee
  status           show the current readings
  quit             stop and exit";

/// Captures a frame and writes it under `dir`. Returns the outcome line.
pub async fn take_snapshot(client: &Client, dir: &Path) -> String {
    match client.capture_snapshot().await {
        Ok(Some(snapshot)) => match save_snapshot(dir, &snapshot, Local::now()).await {
            Ok(path) => {
                tracing::info!(path = %path.display(), bytes = snapshot.bytes.len(), "snapshot saved");
                format!("Saved {}", path.display())
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to save snapshot");
                format!("Snapshot failed: {e}")
            }
        },
        Ok(None) => "No image".into(),
        Err(e) => {
            tracing::warn!(error = %e, "snapshot request failed");
            "No image".into()
        }
    }
}

/// Writes `snapshot` as `snapshot-<timestamp>.<ext>` under `dir`.
pub async fn save_snapshot(
    dir: &Path,
    snapshot: &Snapshot,
    taken_at: DateTime<Local>,
) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let name = format!(
        "snapshot-{}.{}",
        taken_at.format("%Y%m%d-%H%M%S%.3f"),
        snapshot.extension()
    );
    let path = dir.join(name);
    tokio::fs::write(&path, &snapshot.bytes).await?;
    Ok(path)
}

/// Dispatches an XBee command. Returns the outcome line.
pub async fn send_command(client: &Client, command: &str) -> String {
    match client.send_command(command).await {
        Ok(ack) if ack.ok == Some(false) => "Rover rejected the command".into(),
        Ok(_) => "Sent".into(),
        Err(e) => {
            tracing::warn!(error = %e, "xbee send failed");
            format!("Send failed: {e}")
        }
    }
}
