//! Line protocol: request parsing, dispatch onto the queue, reply encoding.
//!
//! ## Requests
//!
//! One line per request, space separated, terminated by `\n` or `\r\n`.
//! Keywords are upper case.
//!
//! | Request               | Reply on success                         |
//! |-----------------------|------------------------------------------|
//! | `UPDATE <id> <delta>` | `+OK`                                    |
//! | `NEXT`                | `+<id>` or `+-1` when empty              |
//! | `PEEK`                | `+<id>` or `+-1` when empty              |
//! | `SCORE <id>`          | `+<score>` or `+-1` when not enqueued    |
//! | `INFO`                | one `+key:value` line per statistic      |
//! | `QUIT`                | `+OK`, then the connection is closed     |
//!
//! ## Errors
//!
//! ```text
//!   bad id token / id <= 0           -> -ERROR INVALID ITEM ID
//!   bad delta token / delta < 1      -> -ERROR INVALID SCORE
//!   score overflow                   -> -ERROR INVALID SCORE
//!   anything else                    -> -ERROR
//! ```
//!
//! Every reply line is a sigil (`+` or `-`), the payload, and `\r\n`.
//!
//! ```
//! use ticketkit::protocol::{self, Command};
//! use ticketkit::shared::SharedQueue;
//!
//! let queue = SharedQueue::new();
//! let reply = protocol::execute(&queue, protocol::parse("UPDATE 5000 3").unwrap());
//! assert_eq!(reply.encode(), b"+OK\r\n");
//!
//! assert_eq!(protocol::parse("SCORE 5000"), Ok(Command::Score { item: 5000 }));
//! assert_eq!(protocol::respond(&queue, "SCORE 5000").encode(), b"+3\r\n");
//! assert_eq!(protocol::respond(&queue, "FLY").encode(), b"-ERROR\r\n");
//! ```

use tracing::trace;

use crate::ds::{ItemId, Score};
use crate::error::{ProtocolError, RaiseError};
use crate::queue::EMPTY_SENTINEL;
use crate::shared::SharedQueue;
use crate::stats::StatsSnapshot;

pub const ERR_GENERIC: &str = "ERROR";
pub const ERR_INVALID_ITEM_ID: &str = "ERROR INVALID ITEM ID";
pub const ERR_INVALID_SCORE: &str = "ERROR INVALID SCORE";

/// A parsed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Update { item: ItemId, delta: Score },
    Next,
    Peek,
    Score { item: ItemId },
    Info,
    Quit,
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Command::Update { .. } => "UPDATE",
            Command::Next => "NEXT",
            Command::Peek => "PEEK",
            Command::Score { .. } => "SCORE",
            Command::Info => "INFO",
            Command::Quit => "QUIT",
        }
    }
}

/// A reply, ready to be framed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Integer(i64),
    Error(&'static str),
    Info(StatsSnapshot),
}

impl Reply {
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Appends the framed reply to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Reply::Ok => out.extend_from_slice(b"+OK\r\n"),
            Reply::Integer(value) => {
                out.push(b'+');
                out.extend_from_slice(value.to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
            },
            Reply::Error(message) => {
                out.push(b'-');
                out.extend_from_slice(message.as_bytes());
                out.extend_from_slice(b"\r\n");
            },
            Reply::Info(stats) => {
                for (key, value) in stats.fields() {
                    out.push(b'+');
                    out.extend_from_slice(key.as_bytes());
                    out.push(b':');
                    out.extend_from_slice(value.as_bytes());
                    out.extend_from_slice(b"\r\n");
                }
            },
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        self.write_to(&mut out);
        out
    }
}

impl From<ProtocolError> for Reply {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidItemId(_) => Reply::Error(ERR_INVALID_ITEM_ID),
            ProtocolError::InvalidScore(_) => Reply::Error(ERR_INVALID_SCORE),
            ProtocolError::Empty | ProtocolError::UnknownCommand(_) | ProtocolError::Arity { .. } => {
                Reply::Error(ERR_GENERIC)
            },
        }
    }
}

impl From<RaiseError> for Reply {
    fn from(err: RaiseError) -> Self {
        match err {
            RaiseError::InvalidItemId(_) => Reply::Error(ERR_INVALID_ITEM_ID),
            RaiseError::InvalidScore(_) | RaiseError::ScoreOverflow { .. } => {
                Reply::Error(ERR_INVALID_SCORE)
            },
        }
    }
}

/// Parses one request line. A trailing `\r` and repeated spaces are ignored.
pub fn parse(line: &str) -> Result<Command, ProtocolError> {
    let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
    let Some((&keyword, args)) = tokens.split_first() else {
        return Err(ProtocolError::Empty);
    };

    match keyword {
        "UPDATE" => {
            expect_args("UPDATE", args, 2)?;
            let item = parse_item_id(args[0])?;
            let delta = parse_delta(args[1])?;
            Ok(Command::Update { item, delta })
        },
        "NEXT" => expect_args("NEXT", args, 0).map(|()| Command::Next),
        "PEEK" => expect_args("PEEK", args, 0).map(|()| Command::Peek),
        "SCORE" => {
            expect_args("SCORE", args, 1)?;
            let item = parse_item_id(args[0])?;
            Ok(Command::Score { item })
        },
        "INFO" => expect_args("INFO", args, 0).map(|()| Command::Info),
        "QUIT" => expect_args("QUIT", args, 0).map(|()| Command::Quit),
        other => Err(ProtocolError::UnknownCommand(other.to_owned())),
    }
}

/// Runs `command` against the queue. Each command takes the lock once.
pub fn execute(queue: &SharedQueue, command: Command) -> Reply {
    let reply = match command {
        Command::Update { item, delta } => match queue.raise(item, delta) {
            Ok(_) => Reply::Ok,
            Err(err) => err.into(),
        },
        Command::Next => Reply::Integer(queue.dequeue_max().unwrap_or(EMPTY_SENTINEL)),
        Command::Peek => Reply::Integer(queue.peek_max().unwrap_or(EMPTY_SENTINEL)),
        Command::Score { item } => Reply::Integer(queue.lookup_score(item).unwrap_or(EMPTY_SENTINEL)),
        Command::Info => Reply::Info(queue.stats()),
        Command::Quit => Reply::Ok,
    };
    trace!(command = command.name(), error = reply.is_error(), "executed");
    reply
}

/// Parses and executes one line.
pub fn respond(queue: &SharedQueue, line: &str) -> Reply {
    match parse(line) {
        Ok(command) => execute(queue, command),
        Err(err) => {
            trace!(error = %err, "rejected request");
            err.into()
        },
    }
}

fn expect_args(command: &'static str, args: &[&str], expected: usize) -> Result<(), ProtocolError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ProtocolError::Arity {
            command,
            expected,
            found: args.len(),
        })
    }
}

fn parse_item_id(token: &str) -> Result<ItemId, ProtocolError> {
    match token.parse::<ItemId>() {
        Ok(item) if item > 0 => Ok(item),
        _ => Err(ProtocolError::InvalidItemId(token.to_owned())),
    }
}

fn parse_delta(token: &str) -> Result<Score, ProtocolError> {
    match token.parse::<Score>() {
        Ok(delta) if delta >= 1 => Ok(delta),
        _ => Err(ProtocolError::InvalidScore(token.to_owned())),
    }
}
