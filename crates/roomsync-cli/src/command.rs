//! Stdin command parsing.
//!
//! Lines starting with `/` are commands; anything else is message text.

use roomsync_core::{QUICK_TOKENS, proto::RoomId};
use thiserror::Error;

/// Input parsing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The command name is not recognized.
    #[error("unknown command: /{0}")]
    Unknown(String),

    /// A required argument is missing.
    #[error("/{0} requires an argument")]
    MissingArgument(&'static str),

    /// The quick-insert index is not a number in range.
    #[error("invalid quick-insert index {0:?} (expected 0..{max})", max = QUICK_TOKENS.len())]
    InvalidIndex(String),
}

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Append text to the draft and submit it.
    Say(String),
    /// Append a quick-insert symbol to the draft.
    Emoji(usize),
    /// Switch to a room.
    Room(RoomId),
    /// Leave the current room.
    Leave,
    /// Take the server link down.
    Drop,
    /// Bring the server link back up.
    Reconnect,
    /// Exit.
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return Ok((!line.trim().is_empty()).then(|| Self::Say(line.to_string())));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();

        let command = match name {
            "emoji" | "e" => {
                let raw = arg.ok_or(CommandError::MissingArgument("emoji"))?;
                let index = raw
                    .parse::<usize>()
                    .ok()
                    .filter(|i| *i < QUICK_TOKENS.len())
                    .ok_or_else(|| CommandError::InvalidIndex(raw.to_string()))?;
                Self::Emoji(index)
            },
            "room" | "join" => {
                Self::Room(RoomId::new(arg.ok_or(CommandError::MissingArgument("room"))?))
            },
            "leave" => Self::Leave,
            "drop" => Self::Drop,
            "reconnect" => Self::Reconnect,
            "quit" | "q" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_said_verbatim() {
        assert_eq!(Command::parse("  hi there "), Ok(Some(Command::Say("  hi there ".into()))));
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn commands_parse() {
        assert_eq!(Command::parse("/emoji 4"), Ok(Some(Command::Emoji(4))));
        assert_eq!(
            Command::parse("/room general"),
            Ok(Some(Command::Room(RoomId::new("general"))))
        );
        assert_eq!(Command::parse("/leave"), Ok(Some(Command::Leave)));
        assert_eq!(Command::parse("/drop"), Ok(Some(Command::Drop)));
        assert_eq!(Command::parse("/reconnect"), Ok(Some(Command::Reconnect)));
        assert_eq!(Command::parse("/q"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn bad_commands_rejected() {
        assert_eq!(Command::parse("/emoji 8"), Err(CommandError::InvalidIndex("8".into())));
        assert_eq!(Command::parse("/emoji x"), Err(CommandError::InvalidIndex("x".into())));
        assert_eq!(Command::parse("/room"), Err(CommandError::MissingArgument("room")));
        assert_eq!(Command::parse("/shrug"), Err(CommandError::Unknown("shrug".into())));
    }
}
