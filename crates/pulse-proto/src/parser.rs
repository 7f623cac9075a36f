//! Frame parser: wire bytes to engine requests.
//!
//! Stateless across frames. Malformed frames fail with a typed
//! error; the caller drops the frame and continues.

use std::error::Error;
use std::fmt;

use pulse_core::{Order, OrderId, OrderRequest, OrderType, Price, Quantity, Side, SymbolId,
    TimeInForce};

use crate::codec::BinaryCodec;
use crate::messages::{CancelOrderMessage, MsgType, NewOrderMessage};

/// Frame rejection reasons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Buffer shorter than the message it should hold.
    BufferTooSmall,
    /// Header declares more bytes than were supplied.
    IncompleteFrame { declared: u64, available: usize },
    /// Unrecognized message type byte.
    UnknownMessageType(u8),
    /// Modify is reserved and not implemented.
    ModifyUnsupported,
    /// Side byte outside the enum.
    InvalidSide(u8),
    /// Order type byte outside the enum.
    InvalidOrderType(u8),
    /// Time-in-force byte outside the enum.
    InvalidTimeInForce(u8),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::BufferTooSmall => write!(f, "buffer too small for message"),
            ParseError::IncompleteFrame {
                declared,
                available,
            } => write!(
                f,
                "incomplete frame: declared {} bytes, got {}",
                declared, available
            ),
            ParseError::UnknownMessageType(byte) => {
                write!(f, "unknown message type {:#04x}", byte)
            }
            ParseError::ModifyUnsupported => write!(f, "modify messages are not supported"),
            ParseError::InvalidSide(byte) => write!(f, "invalid side byte {}", byte),
            ParseError::InvalidOrderType(byte) => write!(f, "invalid order type byte {}", byte),
            ParseError::InvalidTimeInForce(byte) => {
                write!(f, "invalid time-in-force byte {}", byte)
            }
        }
    }
}

impl Error for ParseError {}

/// Wire frame parser.
pub struct MessageParser;

impl MessageParser {
    /// Parse one complete frame into an [`OrderRequest`].
    pub fn parse(buffer: &[u8]) -> Result<OrderRequest, ParseError> {
        let header = BinaryCodec::parse_header(buffer)?;
        let type_byte = header.msg_type;

        let msg_type =
            MsgType::try_from(type_byte).map_err(|_| ParseError::UnknownMessageType(type_byte))?;

        match msg_type {
            MsgType::NewOrder => {
                let msg: NewOrderMessage = BinaryCodec::decode(buffer)?;
                Self::new_order_request(&msg)
            }
            MsgType::CancelOrder => {
                let msg: CancelOrderMessage = BinaryCodec::decode(buffer)?;
                Ok(OrderRequest::Cancel {
                    order_id: OrderId(msg.order_id),
                    symbol_id: SymbolId(msg.symbol_id),
                })
            }
            MsgType::ModifyOrder => Err(ParseError::ModifyUnsupported),
        }
    }

    fn new_order_request(msg: &NewOrderMessage) -> Result<OrderRequest, ParseError> {
        // Copy packed fields to locals before use.
        let side_byte = msg.side;
        let type_byte = msg.order_type;
        let tif_byte = msg.tif;

        let side = Side::try_from(side_byte).map_err(|_| ParseError::InvalidSide(side_byte))?;
        let order_type =
            OrderType::try_from(type_byte).map_err(|_| ParseError::InvalidOrderType(type_byte))?;
        let tif = TimeInForce::try_from(tif_byte)
            .map_err(|_| ParseError::InvalidTimeInForce(tif_byte))?;

        let order = Order::new(
            OrderId(msg.order_id),
            SymbolId(msg.symbol_id),
            side,
            order_type,
            tif,
            Price::from_ticks(msg.price_ticks as u64),
            Quantity(msg.quantity),
        );

        Ok(OrderRequest::New(order))
    }
}
