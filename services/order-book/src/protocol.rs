//! Line-oriented text protocol
//!
//! One command per line, tokens separated by whitespace:
//!
//! ```text
//! order 1001 buy 100 12.30
//! amend 1004 600
//! cancel 1003
//! q level bid 0
//! q order 1004
//! ```
//!
//! Malformed lines never reach the book; they are echoed back as
//! `Got Invalid Message: <line>`.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;
use types::errors::NumericError;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::Side;

use crate::engine::{LevelSummary, OrderBook};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty message")]
    Empty,

    #[error("unknown message type: {0}")]
    UnknownMessage(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("unknown side: {0}")]
    UnknownSide(String),

    #[error("malformed integer for {field}: {value}")]
    MalformedInteger { field: &'static str, value: String },

    #[error("order id must not be negative: {0}")]
    NegativeOrderId(i64),

    #[error("quantity must be positive: {0}")]
    NonPositiveQuantity(i64),

    #[error("invalid price: {0}")]
    Price(#[from] NumericError),
}

/// A parsed protocol command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New {
        order_id: OrderId,
        side: Side,
        quantity: Quantity,
        price: Price,
    },
    Amend {
        order_id: OrderId,
        quantity: Quantity,
    },
    Cancel {
        order_id: OrderId,
    },
    QueryLevel {
        side: Side,
        level: i64,
    },
    QueryOrder {
        order_id: OrderId,
    },
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(message: &str) -> Result<Self, Self::Err> {
        let mut tokens = Tokens(message.split_whitespace());

        match tokens.next("message type")? {
            "order" => Ok(Command::New {
                order_id: parse_order_id(tokens.next("order id")?)?,
                side: parse_side(tokens.next("side")?, "buy", "sell")?,
                quantity: parse_quantity(tokens.next("quantity")?)?,
                price: tokens.next("price")?.parse()?,
            }),
            "amend" => Ok(Command::Amend {
                order_id: parse_order_id(tokens.next("order id")?)?,
                quantity: parse_quantity(tokens.next("quantity")?)?,
            }),
            "cancel" => Ok(Command::Cancel {
                order_id: parse_order_id(tokens.next("order id")?)?,
            }),
            "q" => match tokens.next("query type")? {
                "level" => Ok(Command::QueryLevel {
                    side: parse_side(tokens.next("book side")?, "bid", "ask")?,
                    level: parse_integer(tokens.next("level")?, "level")?,
                }),
                "order" => Ok(Command::QueryOrder {
                    order_id: parse_order_id(tokens.next("order id")?)?,
                }),
                other => Err(ProtocolError::UnknownMessage(format!("q {}", other))),
            },
            other => Err(ProtocolError::UnknownMessage(other.to_string())),
        }
    }
}

struct Tokens<'a>(std::str::SplitWhitespace<'a>);

impl<'a> Tokens<'a> {
    fn next(&mut self, field: &'static str) -> Result<&'a str, ProtocolError> {
        self.0.next().ok_or(if field == "message type" {
            ProtocolError::Empty
        } else {
            ProtocolError::MissingField(field)
        })
    }
}

fn parse_integer(value: &str, field: &'static str) -> Result<i64, ProtocolError> {
    value.parse::<i64>().map_err(|_| ProtocolError::MalformedInteger {
        field,
        value: value.to_string(),
    })
}

fn parse_order_id(value: &str) -> Result<OrderId, ProtocolError> {
    let raw = parse_integer(value, "order id")?;
    u64::try_from(raw)
        .map(OrderId::new)
        .map_err(|_| ProtocolError::NegativeOrderId(raw))
}

fn parse_quantity(value: &str) -> Result<Quantity, ProtocolError> {
    let raw = parse_integer(value, "quantity")?;
    match u64::try_from(raw) {
        Ok(lots) if lots > 0 => Ok(Quantity::new(lots)),
        _ => Err(ProtocolError::NonPositiveQuantity(raw)),
    }
}

fn parse_side(value: &str, buy: &str, sell: &str) -> Result<Side, ProtocolError> {
    if value == buy {
        Ok(Side::Buy)
    } else if value == sell {
        Ok(Side::Sell)
    } else {
        Err(ProtocolError::UnknownSide(value.to_string()))
    }
}

/// Parse one line and apply it to the book, writing any response to `output`
pub fn process_message<W: Write>(book: &mut OrderBook, message: &str, output: &mut W) -> io::Result<()> {
    match message.parse::<Command>() {
        Ok(command) => execute(book, command, output),
        Err(reason) => {
            debug!(%reason, line = message, "Invalid message");
            writeln!(output, "Got Invalid Message: {}", message)
        }
    }
}

/// Feed every line of `input` through `process_message`
///
/// Lines are read as raw bytes and decoded lossily, so a line that is not
/// valid UTF-8 gets the invalid-message reply instead of ending the session.
/// Blank lines are skipped. Returns the number of lines processed.
pub fn run_session<R: BufRead, W: Write>(book: &mut OrderBook, mut input: R, output: &mut W) -> io::Result<u64> {
    let mut processed = 0u64;
    let mut raw = Vec::new();

    loop {
        raw.clear();
        if input.read_until(b'\n', &mut raw)? == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&raw);
        let message = line.trim_end_matches(&['\n', '\r'][..]);
        if message.trim().is_empty() {
            continue;
        }
        process_message(book, message, output)?;
        processed += 1;
    }

    Ok(processed)
}

/// Apply a parsed command; only queries write output
pub fn execute<W: Write>(book: &mut OrderBook, command: Command, output: &mut W) -> io::Result<()> {
    match command {
        Command::New {
            order_id,
            side,
            quantity,
            price,
        } => book.new_order(order_id, side, quantity, price),
        Command::Amend { order_id, quantity } => book.amend_order(order_id, quantity),
        Command::Cancel { order_id } => book.cancel_order(order_id),
        Command::QueryLevel { side, level } => {
            let summary = usize::try_from(level)
                .map_or(LevelSummary::EMPTY, |index| book.get_level(side, index));
            let label = match side {
                Side::Buy => "bid",
                Side::Sell => "ask",
            };
            writeln!(
                output,
                "{}, {}, {}, {}, {}",
                label, level, summary.price, summary.quantity, summary.order_count
            )?;
        }
        Command::QueryOrder { order_id } => match book.get_order(order_id) {
            Some(order) => {
                let position = book
                    .get_position(order_id)
                    .map_or(-1, |position| position as i64);
                writeln!(
                    output,
                    "order, {}, {}, {}, {}",
                    order_id,
                    order.status,
                    order.leaves_quantity(),
                    position
                )?;
            }
            None => writeln!(output, "order, {} Not found", order_id)?,
        },
    }
    Ok(())
}

/// Write the top of book and the full order dump
pub fn write_book<W: Write>(book: &OrderBook, output: &mut W) -> io::Result<()> {
    let snapshot = book.snapshot();

    writeln!(output, "Bid/Ask: ")?;
    for (rank, level) in snapshot.bids.iter().enumerate() {
        writeln!(output, "Bid {}: px={}, qty={}", rank + 1, level.price, level.quantity)?;
    }
    for (rank, level) in snapshot.asks.iter().enumerate() {
        writeln!(output, "Ask {}: px={}, qty={}", rank + 1, level.price, level.quantity)?;
    }

    writeln!(output, "Orders: ")?;
    for order in book.orders() {
        writeln!(
            output,
            "orderId={}, px={}, qty={}, cumQty={}, status={}",
            order.order_id, order.price, order.quantity, order.filled_quantity, order.status
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(book: &mut OrderBook, message: &str) -> String {
        let mut out = Vec::new();
        process_message(book, message, &mut out).unwrap();
        String::from_utf8(out).unwrap().trim().to_string()
    }

    #[test]
    fn test_parse_new_order() {
        let command: Command = "order 1001 buy 100 12.30".parse().unwrap();
        assert_eq!(
            command,
            Command::New {
                order_id: OrderId::new(1001),
                side: Side::Buy,
                quantity: Quantity::new(100),
                price: "12.3".parse().unwrap(),
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(ProtocolError::Empty));
        assert_eq!(
            "order 1 buy 5".parse::<Command>(),
            Err(ProtocolError::MissingField("price"))
        );
        assert_eq!(
            "order -1 buy 5 10".parse::<Command>(),
            Err(ProtocolError::NegativeOrderId(-1))
        );
        assert_eq!(
            "amend 7 0".parse::<Command>(),
            Err(ProtocolError::NonPositiveQuantity(0))
        );
        assert_eq!(
            "order 1 hold 5 10".parse::<Command>(),
            Err(ProtocolError::UnknownSide("hold".to_string()))
        );
        assert!(matches!(
            "order 1 buy 5 -10".parse::<Command>(),
            Err(ProtocolError::Price(NumericError::NonPositivePrice(_)))
        ));
        assert!(matches!(
            "cancel abc".parse::<Command>(),
            Err(ProtocolError::MalformedInteger { .. })
        ));
        assert!(matches!(
            "q depth bid 0".parse::<Command>(),
            Err(ProtocolError::UnknownMessage(_))
        ));
    }

    #[test]
    fn test_invalid_message_echo() {
        let mut book = OrderBook::new();
        assert_eq!(
            run(&mut book, "replace 1 2"),
            "Got Invalid Message: replace 1 2"
        );
        assert_eq!(run(&mut book, "q level mid 0"), "Got Invalid Message: q level mid 0");
    }

    #[test]
    fn test_commands_write_nothing() {
        let mut book = OrderBook::new();
        assert_eq!(run(&mut book, "order 1 buy 5 10"), "");
        assert_eq!(run(&mut book, "amend 1 6"), "");
        assert_eq!(run(&mut book, "cancel 1"), "");
    }

    #[test]
    fn test_negative_level_is_empty() {
        let mut book = OrderBook::new();
        run(&mut book, "order 1 buy 5 10");
        assert_eq!(run(&mut book, "q level bid -1"), "bid, -1, 0, 0, 0");
    }

    #[test]
    fn test_order_not_found() {
        let mut book = OrderBook::new();
        assert_eq!(run(&mut book, "q order 5"), "order, 5 Not found");
    }

    #[test]
    fn test_session_survives_invalid_utf8() {
        let mut book = OrderBook::new();
        let input: &[u8] = b"order 1 buy 5 10\norder 2 sell 3 \xff\xfe\r\n\nq order 1\n";
        let mut out = Vec::new();

        let processed = run_session(&mut book, input, &mut out).unwrap();

        assert_eq!(processed, 3);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Got Invalid Message: order 2 sell 3 "));
        assert_eq!(lines[1], "order, 1, New, 5, 0");
        assert!(book.get_order(OrderId::new(2)).is_none());
    }

    #[test]
    fn test_session_without_trailing_newline() {
        let mut book = OrderBook::new();
        let mut out = Vec::new();

        run_session(&mut book, &b"order 7 sell 2 1e3\nq level ask 0"[..], &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "ask, 0, 1000, 2, 1\n");
    }

    #[test]
    fn test_level_query_with_huge_quantities() {
        let mut book = OrderBook::new();
        for order_id in 1..=3 {
            run(&mut book, &format!("order {} buy 9223372036854775807 10", order_id));
        }

        assert_eq!(run(&mut book, "q level bid 0"), "bid, 0, 10, 18446744073709551615, 3");
    }

    #[test]
    fn test_write_book() {
        let mut book = OrderBook::new();
        run(&mut book, "order 1 buy 100 12.30");
        run(&mut book, "order 2 sell 40 12.50");
        run(&mut book, "order 3 sell 10 12.25");

        let mut out = Vec::new();
        write_book(&book, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let expected = "Bid/Ask: \n\
            Bid 1: px=12.3, qty=90\n\
            Ask 1: px=12.5, qty=40\n\
            Orders: \n\
            orderId=1, px=12.3, qty=100, cumQty=10, status=PartiallyFilled\n\
            orderId=2, px=12.5, qty=40, cumQty=0, status=New\n\
            orderId=3, px=12.25, qty=10, cumQty=10, status=Filled\n";
        assert_eq!(text, expected);
    }
}
