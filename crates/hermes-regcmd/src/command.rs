//! Textual register command protocol.
//!
//! Requests are JSON objects with the fields `cmd` (`"read"` or `"write"`), `addr`, `mask` and,
//! for writes, `val`. Numeric fields are JSON numbers or strings in decimal or `0x` hex.
//!
//! ```text
//! {"cmd":"read","addr":"0x2","mask":"0xffffffff"}        -> {"read_val":"0x1f"}
//! {"cmd":"write","addr":"0x2","mask":"0xff00","val":"3"} -> {"write_done":true}
//! {"cmd":"poke"}                                          -> {"err":"InvalidCommand"}
//! ```

use hermes_regbus::{num, BusError, RegisterBus, RegisterWindow};
use serde::Serialize;
use serde_json::{Map, Value};

const KNOWN_FIELDS: [&str; 4] = ["cmd", "addr", "mask", "val"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Read { addr: u32, mask: u32 },
    Write { addr: u32, mask: u32, val: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("request is not a JSON object")]
    InvalidJsonFormat,
    #[error("request carries an unknown field")]
    InvalidMessage,
    #[error("request is missing field {0:?}")]
    MissingField(&'static str),
    #[error("address is not a 32-bit unsigned integer")]
    InvalidAddress,
    #[error("mask is not a 32-bit unsigned integer")]
    InvalidMask,
    #[error("value is not a 32-bit unsigned integer")]
    InvalidValue,
    #[error("unknown command")]
    InvalidCommand,
    #[error("register bus error: {0}")]
    Bus(String),
}

impl CommandError {
    /// Error code sent to the client in the `err` field.
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::InvalidJsonFormat => "InvalidJSONFormat",
            CommandError::InvalidMessage => "InvalidMessage",
            CommandError::MissingField(_) => "MissingField",
            CommandError::InvalidAddress => "InvalidAddress",
            CommandError::InvalidMask => "InvalidMask",
            CommandError::InvalidValue => "InvalidValue",
            CommandError::InvalidCommand => "InvalidCommand",
            CommandError::Bus(_) => "BusError",
        }
    }
}

impl From<BusError> for CommandError {
    fn from(err: BusError) -> Self {
        CommandError::Bus(err.to_string())
    }
}

/// One reply line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Read {
        read_val: String,
    },
    Write {
        write_done: bool,
    },
    Error {
        err: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

impl From<CommandError> for Reply {
    fn from(err: CommandError) -> Self {
        let code = err.code();
        let (field, detail) = match err {
            CommandError::MissingField(field) => (Some(field), None),
            CommandError::Bus(detail) => (None, Some(detail)),
            _ => (None, None),
        };
        Reply::Error {
            err: code,
            field,
            detail,
        }
    }
}

impl Reply {
    pub fn to_json(&self) -> String {
        // Serialising these shapes cannot fail: every field is a string, bool or option thereof.
        serde_json::to_string(self).unwrap_or_else(|_| String::from(r#"{"err":"Internal"}"#))
    }
}

/// Validates one request line.
///
/// Checks run in a fixed order: JSON shape, unknown fields, required fields, address, mask,
/// command name, then the write value.
pub fn parse_request(text: &str) -> Result<Command, CommandError> {
    let value: Value = serde_json::from_str(text).map_err(|_| CommandError::InvalidJsonFormat)?;
    let Value::Object(fields) = value else {
        return Err(CommandError::InvalidJsonFormat);
    };

    if fields.keys().any(|k| !KNOWN_FIELDS.contains(&k.as_str())) {
        return Err(CommandError::InvalidMessage);
    }

    let cmd = required(&fields, "cmd")?;
    let addr = number(required(&fields, "addr")?).ok_or(CommandError::InvalidAddress)?;
    let mask = number(required(&fields, "mask")?).ok_or(CommandError::InvalidMask)?;

    match cmd.as_str() {
        Some("read") => Ok(Command::Read { addr, mask }),
        Some("write") => {
            let val = number(required(&fields, "val")?).ok_or(CommandError::InvalidValue)?;
            Ok(Command::Write { addr, mask, val })
        }
        _ => Err(CommandError::InvalidCommand),
    }
}

fn required<'a>(fields: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value, CommandError> {
    fields.get(name).ok_or(CommandError::MissingField(name))
}

fn number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => num::parse_u32(s),
        _ => None,
    }
}

/// Runs `command` against the bus.
pub fn execute<W: RegisterWindow>(
    bus: &mut RegisterBus<W>,
    command: Command,
) -> Result<Reply, CommandError> {
    match command {
        Command::Read { addr, mask } => {
            let val = bus.read_scalar(addr as usize, mask)?;
            tracing::info!("read 0x{val:x} at 0x{addr:x} with mask 0x{mask:x}");
            Ok(Reply::Read {
                read_val: format!("0x{val:x}"),
            })
        }
        Command::Write { addr, mask, val } => {
            bus.write_scalar(addr as usize, mask, val)?;
            tracing::info!("write 0x{val:x} at 0x{addr:x} with mask 0x{mask:x}");
            Ok(Reply::Write { write_done: true })
        }
    }
}
