//! Line-oriented shell front-end. The current channel lives in an explicit
//! [`ShellSession`]; `/dm` and `/ch` switch it.

use shellbot::config::ShellConfig;
use shellbot::{Bot, Message, ReplyContext, DM_CHANNEL};
use std::io::Write;
use tokio::sync::mpsc;

/// Channel used by `/ch`.
pub const PUBLIC_CHANNEL: &str = "##";

/// Where the operator is typing from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSession {
    pub channel: String,
    pub user: String,
}

impl ShellSession {
    pub fn new(config: &ShellConfig) -> Self {
        Self {
            channel: config.channel.clone(),
            user: config.user.clone(),
        }
    }

    pub fn prompt(&self) -> String {
        format!("{}> ", self.channel)
    }

    pub fn message(&self, text: &str) -> Message {
        Message::text(&self.channel, &self.user, text)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ShellInput {
    SwitchChannel(&'static str),
    Quit,
    Say(String),
    Empty,
}

pub fn parse_line(line: &str) -> ShellInput {
    let input = line.trim_end_matches(&['\r', '\n'][..]);
    match input.trim() {
        "" => ShellInput::Empty,
        "/dm" => ShellInput::SwitchChannel(DM_CHANNEL),
        "/ch" => ShellInput::SwitchChannel(PUBLIC_CHANNEL),
        cmd if cmd.eq_ignore_ascii_case("/quit") || cmd.eq_ignore_ascii_case("/exit") => {
            ShellInput::Quit
        }
        _ => ShellInput::Say(input.to_string()),
    }
}

/// Read stdin on a plain thread so a pending read never holds up runtime shutdown.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        loop {
            let mut line = String::new();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

fn print_prompt(session: &ShellSession) {
    let mut out = std::io::stdout();
    let _ = write!(out, "{}", session.prompt());
    let _ = out.flush();
}

/// Run the REPL until `/quit` or end of input. Each line is routed before the next prompt.
pub async fn run(
    bot: Bot,
    mut session: ShellSession,
    mut lines: mpsc::Receiver<String>,
) -> anyhow::Result<()> {
    print_prompt(&session);
    while let Some(line) = lines.recv().await {
        match parse_line(&line) {
            ShellInput::Quit => break,
            ShellInput::Empty => {}
            ShellInput::SwitchChannel(channel) => {
                session.channel = channel.to_string();
            }
            ShellInput::Say(text) => {
                log::debug!("got '{}'", text);
                bot.receive(ReplyContext::new(session.message(&text))).await;
            }
        }
        print_prompt(&session);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_commands() {
        assert_eq!(parse_line("/dm\n"), ShellInput::SwitchChannel(DM_CHANNEL));
        assert_eq!(parse_line(" /ch "), ShellInput::SwitchChannel(PUBLIC_CHANNEL));
        assert_eq!(parse_line("/QUIT"), ShellInput::Quit);
        assert_eq!(parse_line("/exit\r\n"), ShellInput::Quit);
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_line("\n"), ShellInput::Empty);
        assert_eq!(parse_line("   \n"), ShellInput::Empty);
    }

    #[test]
    fn anything_else_is_said() {
        assert_eq!(
            parse_line("@ShellBot hello\n"),
            ShellInput::Say("@ShellBot hello".to_string())
        );
        assert_eq!(parse_line("/dmx"), ShellInput::Say("/dmx".to_string()));
    }

    #[test]
    fn session_builds_messages_in_current_channel() {
        let mut session = ShellSession::new(&ShellConfig::default());
        assert_eq!(session.prompt(), "##> ");
        session.channel = DM_CHANNEL.to_string();
        let m = session.message("hi");
        assert_eq!(m.channel, DM_CHANNEL);
        assert_eq!(m.user, "SHELLUSER");
        assert_eq!(m.text.as_deref(), Some("hi"));
        assert_eq!(session.prompt(), "DM> ");
    }
}
