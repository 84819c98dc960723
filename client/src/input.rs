//! Terminal command parsing
//!
//! Each line typed by the operator becomes one [`Command`]. The grid is
//! addressed with zero-based column/row numbers.

use log::debug;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Move the operator's avatar to a cell.
    Move { x: i32, y: i32 },
    /// List the players standing on a cell.
    At { x: i32, y: i32 },
    List,
    Map,
    /// Highlight a player by display name, or clear the highlight.
    Highlight(Option<String>),
    Dedup,
    Sync,
    /// Forget the stored identity and everything known locally.
    Purge,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("`{command}` expects {expected}")]
    Usage {
        command: &'static str,
        expected: &'static str,
    },
    #[error("`{0}` is not a number")]
    NotANumber(String),
}

pub const HELP: &str = "\
commands:
  move X Y        move your avatar (alias: m)
  at X Y          who is on a cell
  list            list known players
  map             draw the grid
  highlight NAME  highlight a player (`highlight none` clears)
  dedup           collapse players sharing a name
  sync            re-derive your avatar from the roster
  purge           forget stored identity and players
  quit            leave";

impl Command {
    pub fn parse(line: &str) -> Result<Self, InputError> {
        let mut words = line.split_whitespace();
        let head = words.next().ok_or(InputError::Empty)?.to_lowercase();
        let rest: Vec<&str> = words.collect();

        match head.as_str() {
            "move" | "m" => {
                let (x, y) = coordinates("move", &rest)?;
                Ok(Command::Move { x, y })
            }
            "at" => {
                let (x, y) = coordinates("at", &rest)?;
                Ok(Command::At { x, y })
            }
            "list" | "ls" => Ok(Command::List),
            "map" => Ok(Command::Map),
            "highlight" | "hl" => match rest.as_slice() {
                [] => Err(InputError::Usage {
                    command: "highlight",
                    expected: "a player name or `none`",
                }),
                ["none"] => Ok(Command::Highlight(None)),
                names => Ok(Command::Highlight(Some(names.join(" ")))),
            },
            "dedup" => Ok(Command::Dedup),
            "sync" => Ok(Command::Sync),
            "purge" => Ok(Command::Purge),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(InputError::Unknown(other.to_string())),
        }
    }
}

/// Feeds parsed stdin lines into `commands`. End of input counts as `quit`.
pub fn spawn_stdin_reader(commands: mpsc::Sender<Command>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let command = match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match Command::parse(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                },
                Ok(None) => Command::Quit,
                Err(e) => {
                    debug!("stdin closed: {}", e);
                    Command::Quit
                }
            };

            let quit = command == Command::Quit;
            if commands.send(command).await.is_err() || quit {
                break;
            }
        }
    })
}

fn coordinates(command: &'static str, args: &[&str]) -> Result<(i32, i32), InputError> {
    match args {
        [x, y] => Ok((number(x)?, number(y)?)),
        _ => Err(InputError::Usage {
            command,
            expected: "two coordinates: X Y",
        }),
    }
}

fn number(word: &str) -> Result<i32, InputError> {
    word.parse()
        .map_err(|_| InputError::NotANumber(word.to_string()))
}
