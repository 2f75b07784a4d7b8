// Headless front-end - line-oriented chat on stdin/stdout
//
// Used when the TUI is disabled or stdout is not a terminal. Lines starting
// with `/` are commands; anything else is sent as a chat message.

use crate::chat::{ChatController, ChatState, SessionEvent};
use crate::routes::LOGIN_PATH;
use crate::tui::Exit;
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const HELP: &str = "\
Commands:
  /select N    pick product option N
  /similar N   find products similar to option N
  /new         start a new conversation
  /help        show this help
  /quit        exit";

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Select(usize),
    Similar(usize),
    New,
    Help,
    Quit,
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Some(Command::Send(line.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let index = parts
            .next()
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .map(|n| n - 1);

        Some(match (name, index) {
            ("select", Some(i)) => Command::Select(i),
            ("similar", Some(i)) => Command::Similar(i),
            ("select" | "similar", None) => {
                Command::Invalid(format!("usage: /{} N (N starts at 1)", name))
            }
            ("new", _) => Command::New,
            ("help", _) => Command::Help,
            ("quit" | "exit", _) => Command::Quit,
            _ => Command::Invalid(format!("unknown command /{}, try /help", name)),
        })
    }
}

/// Prints what changed in the transcript since the last call
#[derive(Default)]
struct Printer {
    shown: usize,
    options: Vec<String>,
    typing: bool,
}

impl Printer {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn flush(&mut self, chat: &ChatState) {
        let messages = chat.messages();
        if messages.len() < self.shown {
            self.shown = 0;
        }
        for message in &messages[self.shown..] {
            // The user's own lines are already on screen
            if !message.is_user {
                println!("assistant> {}", message.content);
            }
        }
        self.shown = messages.len();

        let options: Vec<String> = chat
            .product_options()
            .iter()
            .map(|o| match &o.price {
                Some(price) => format!("{} ({}, {})", o.title, price, o.platform),
                None => format!("{} ({})", o.title, o.platform),
            })
            .collect();
        if options != self.options && !options.is_empty() {
            println!("Products:");
            for (i, option) in options.iter().enumerate() {
                println!("  {}. {}", i + 1, option);
            }
            println!("  (/select N to choose, /similar N for alternatives)");
        }
        self.options = options;

        if chat.is_typing() && !self.typing {
            println!("assistant is typing...");
        }
        self.typing = chat.is_typing();
    }
}

pub async fn run_repl(
    controller: &mut ChatController,
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    navigation: &mut mpsc::UnboundedReceiver<String>,
) -> Result<Exit> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printer = Printer::default();
    printer.flush(controller.state());
    println!("Type a message, or /help for commands.");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(Exit::Quit);
                };
                match Command::parse(&line) {
                    None => {}
                    Some(Command::Send(text)) => controller.submit(&text).await,
                    Some(Command::Select(i)) => {
                        if !controller.select_product(i) {
                            println!("no product option {}", i + 1);
                        }
                    }
                    Some(Command::Similar(i)) => {
                        if !controller.find_similar(i).await {
                            println!("no product option {}", i + 1);
                        }
                    }
                    Some(Command::New) => {
                        controller.new_chat();
                        printer.reset();
                    }
                    Some(Command::Help) => println!("{}", HELP),
                    Some(Command::Quit) => return Ok(Exit::Quit),
                    Some(Command::Invalid(message)) => println!("{}", message),
                }
            }

            Some(event) = events.recv() => controller.handle_event(event),

            Some(path) = navigation.recv() => {
                if path == LOGIN_PATH {
                    println!("Your session has ended. Please sign in again.");
                    return Ok(Exit::LoginRequired);
                }
            }
        }
        printer.flush(controller.state());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_text_is_a_message() {
        assert_eq!(
            Command::parse("  red shoes "),
            Some(Command::Send("red shoes".to_string()))
        );
        assert_eq!(Command::parse("   "), None);
    }

    #[test]
    fn test_parse_indices_are_one_based() {
        assert_eq!(Command::parse("/select 1"), Some(Command::Select(0)));
        assert_eq!(Command::parse("/similar 3"), Some(Command::Similar(2)));
        assert!(matches!(
            Command::parse("/select 0"),
            Some(Command::Invalid(_))
        ));
        assert!(matches!(
            Command::parse("/select x"),
            Some(Command::Invalid(_))
        ));
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/new"), Some(Command::New));
        assert_eq!(Command::parse("/quit"), Some(Command::Quit));
        assert_eq!(Command::parse("/exit"), Some(Command::Quit));
        assert_eq!(Command::parse("/help"), Some(Command::Help));
        assert!(matches!(Command::parse("/dance"), Some(Command::Invalid(_))));
    }
}
