//! Typed commands.
//!
//! A request arrives as a list of byte strings. [`Command::from_args`] checks
//! the name (case-insensitively) and the arity and turns the arguments into
//! one of the supported commands. Anything else becomes a [`CommandError`],
//! whose `Display` output is the error reply sent to the client.

use bytes::Bytes;
use thiserror::Error;

/// Separator between the hostname and the rest of a SET value.
pub const VALUE_SEPARATOR: char = ';';

/// A parsed, validated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `PING`
    Ping,
    /// `QUIT`
    Quit,
    /// `SET ip "hostname;..."`
    Set { ip: String, hostname: String },
    /// `GET ip`
    Get { ip: String },
    /// `DEL ip`
    Del { ip: String },
}

/// Reasons a request cannot be turned into a [`Command`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR empty command")]
    Empty,

    #[error("ERR unknown command '{0}'")]
    Unknown(String),

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),

    #[error("ERR invalid {0}: not valid UTF-8")]
    InvalidUtf8(&'static str),
}

fn utf8(arg: Bytes, what: &'static str) -> Result<String, CommandError> {
    String::from_utf8(arg.to_vec()).map_err(|_| CommandError::InvalidUtf8(what))
}

/// Extracts the hostname from a SET value: everything before the first `;`.
pub fn hostname_field(value: &str) -> &str {
    value.split(VALUE_SEPARATOR).next().unwrap_or(value)
}

impl Command {
    /// Builds a command from raw request arguments.
    ///
    /// Error messages name the command exactly as the client sent it.
    pub fn from_args(args: Vec<Bytes>) -> Result<Self, CommandError> {
        let mut args = args.into_iter();
        let raw_name = args.next().ok_or(CommandError::Empty)?;
        let name = String::from_utf8_lossy(&raw_name).into_owned();
        let rest: Vec<Bytes> = args.collect();

        let arity_error = || CommandError::WrongArity(name.clone());

        match name.to_ascii_uppercase().as_str() {
            "PING" | "QUIT" if !rest.is_empty() => Err(arity_error()),
            "PING" => Ok(Command::Ping),
            "QUIT" => Ok(Command::Quit),
            "SET" => {
                let [ip, value] = <[Bytes; 2]>::try_from(rest).map_err(|_| arity_error())?;
                let ip = utf8(ip, "key")?;
                let value = utf8(value, "value")?;
                Ok(Command::Set {
                    ip,
                    hostname: hostname_field(&value).to_string(),
                })
            }
            "GET" => {
                let [ip] = <[Bytes; 1]>::try_from(rest).map_err(|_| arity_error())?;
                Ok(Command::Get {
                    ip: utf8(ip, "key")?,
                })
            }
            "DEL" => {
                let [ip] = <[Bytes; 1]>::try_from(rest).map_err(|_| arity_error())?;
                Ok(Command::Del {
                    ip: utf8(ip, "key")?,
                })
            }
            _ => Err(CommandError::Unknown(name)),
        }
    }
}
