//! Interactive control loop: the keyboard stands in for the dashboard's
//! capture / upload / reset buttons.

use crate::output::DashboardSink;
use crate::session::Session;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

pub const HELP: &str = "commands: c = capture & analyze, u <path> = upload image, l = back to live camera, \
r = reset, h = help, q = quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Capture,
    Upload(PathBuf),
    Live,
    Reset,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "" | "c" | "capture" => Command::Capture,
        "u" | "upload" => {
            if rest.is_empty() {
                bail!("upload needs a file path");
            }
            Command::Upload(PathBuf::from(rest))
        }
        "l" | "live" => Command::Live,
        "r" | "reset" => Command::Reset,
        "h" | "help" | "?" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        other => bail!("unknown command '{}'", other),
    };
    Ok(command)
}

/// Read commands from stdin until `q` or end of input
pub async fn run(session: &Session, sink: &mut dyn DashboardSink) -> Result<()> {
    eprintln!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read command")? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(err) => {
                eprintln!("{}", err);
                continue;
            }
        };

        tracing::debug!("Command: {:?}", command);

        // Faults land in the session state and show up in the dashboard
        match command {
            Command::Capture => {
                let _ = session.capture_and_analyze().await;
            }
            Command::Upload(path) => {
                let _ = session.accept_uploaded_file(&path).await;
            }
            Command::Live => {
                session.clear_preview().await;
                let _ = session.start().await;
            }
            Command::Reset => {
                let _ = session.reset().await;
            }
            Command::Help => {
                eprintln!("{}", HELP);
                continue;
            }
            Command::Quit => break,
        }

        sink.present(&session.snapshot())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_button_equivalents() {
        assert_eq!(parse_command("c").unwrap(), Command::Capture);
        assert_eq!(parse_command("").unwrap(), Command::Capture);
        assert_eq!(parse_command("  RESET ").unwrap(), Command::Reset);
        assert_eq!(parse_command("l").unwrap(), Command::Live);
        assert_eq!(parse_command("quit").unwrap(), Command::Quit);
    }

    #[test]
    fn upload_keeps_path_with_spaces() {
        assert_eq!(
            parse_command("u  /tmp/my room.jpg").unwrap(),
            Command::Upload(PathBuf::from("/tmp/my room.jpg"))
        );
        assert!(parse_command("upload").is_err());
    }

    #[test]
    fn rejects_unknown_commands() {
        let err = parse_command("zoom 2").unwrap_err();
        assert_eq!(err.to_string(), "unknown command 'zoom'");
    }
}
