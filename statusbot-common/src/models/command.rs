use serde::{Serialize, Deserialize};

/// A chat command such as `!addserver host:port`, with the prefix removed from the verb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub verb: String,
    pub args: Vec<String>,
}

impl Command {
    /// Splits `content` on whitespace. Returns `None` when the message does not
    /// start with `prefix` or has no tokens. The verb may be empty (a bare prefix).
    pub fn parse(content: &str, prefix: &str) -> Option<Command> {
        if !content.starts_with(prefix) {
            return None;
        }
        let mut tokens = content.split_whitespace();
        let first = tokens.next()?;
        let verb = first.strip_prefix(prefix).unwrap_or(first).to_string();
        Some(Command {
            verb,
            args: tokens.map(str::to_string).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_verb_and_args() {
        let cmd = Command::parse("!addserver 1.2.3.4:27015  extra", "!").unwrap();
        assert_eq!(cmd.verb, "addserver");
        assert_eq!(cmd.args, vec!["1.2.3.4:27015", "extra"]);
    }

    #[test]
    fn needs_prefix() {
        assert!(Command::parse("addserver x", "!").is_none());
        assert!(Command::parse(" !addserver", "!").is_none());
    }

    #[test]
    fn bare_prefix_has_empty_verb() {
        let cmd = Command::parse("!", "!").unwrap();
        assert_eq!(cmd.verb, "");
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn multi_char_prefix() {
        let cmd = Command::parse("sb!addserver a", "sb!").unwrap();
        assert_eq!(cmd.verb, "addserver");
    }
}
