//! Command recognition.
//!
//! A command is a message whose text starts with the configured delimiter
//! immediately followed by a command word:
//!
//! ```text
//! /sendall@my_bot hello   world
//! ^^^^^^^^^^^^^^^ ^^^^^   ^^^^^
//! name + mention  arg[0]  arg[1]
//! ```
//!
//! The `@mention` suffix is stripped and never part of the name. Parsing is a
//! pure function of the text.

use serde::{Deserialize, Serialize};

/// Default command delimiter.
pub const DEFAULT_DELIMITER: char = '/';

/// A recognized command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Command name as written, without delimiter or `@mention`.
    pub name: String,
    /// Whitespace-delimited arguments following the command token.
    pub args: Vec<String>,
}

impl Command {
    /// Creates a command.
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Returns the argument at `index`.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Returns the arguments joined by single spaces.
    pub fn args_text(&self) -> String {
        self.args.join(" ")
    }
}

/// Parses message text into [`Command`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandParser {
    delimiter: char,
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl CommandParser {
    /// Creates a parser recognizing commands that start with `delimiter`.
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// Returns the delimiter.
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Attempts to parse `text` as a command.
    ///
    /// Returns `None` for empty text, text not starting with the delimiter,
    /// and a delimiter not directly followed by a command word.
    pub fn try_parse(&self, text: &str) -> Option<Command> {
        let rest = text.strip_prefix(self.delimiter)?;
        // A delimiter followed by whitespace must not borrow the next word.
        if rest.starts_with(char::is_whitespace) {
            return None;
        }

        let mut tokens = rest.split_whitespace();
        let head = tokens.next()?;

        let name = match head.split_once('@') {
            Some((name, _mention)) => name,
            None => head,
        };
        if name.is_empty() {
            return None;
        }

        Some(Command {
            name: name.to_string(),
            args: tokens.map(str::to_string).collect(),
        })
    }
}
