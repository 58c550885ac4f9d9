use crate::networking::cursor::DecodeError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Every wire command this node decodes. Commands outside this set are
/// still delivered to subscribers, as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Version,
    Verack,
    Addr,
    GetAddr,
    Alert,
    GetBlocks,
    GetHeaders,
    Headers,
    Inv,
    NotFound,
    Ping,
    Pong,
    Tx,
}

impl Command {
    pub const ALL: [Command; 13] = [
        Command::Version,
        Command::Verack,
        Command::Addr,
        Command::GetAddr,
        Command::Alert,
        Command::GetBlocks,
        Command::GetHeaders,
        Command::Headers,
        Command::Inv,
        Command::NotFound,
        Command::Ping,
        Command::Pong,
        Command::Tx,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Version => "version",
            Command::Verack => "verack",
            Command::Addr => "addr",
            Command::GetAddr => "getaddr",
            Command::Alert => "alert",
            Command::GetBlocks => "getblocks",
            Command::GetHeaders => "getheaders",
            Command::Headers => "headers",
            Command::Inv => "inv",
            Command::NotFound => "notfound",
            Command::Ping => "ping",
            Command::Pong => "pong",
            Command::Tx => "tx",
        }
    }
}

impl FromStr for Command {
    type Err = DecodeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .iter()
            .copied()
            .find(|command| command.as_str() == name)
            .ok_or_else(|| DecodeError::UnknownCommand(name.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for command in Command::ALL.iter() {
            assert_eq!(command.as_str().parse::<Command>().unwrap(), *command);
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(
            "block".parse::<Command>(),
            Err(DecodeError::UnknownCommand("block".to_string()))
        );
    }
}
