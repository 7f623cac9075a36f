//! Binary wire protocol: packed message layouts, codec, and the
//! frame parser that turns raw bytes into engine requests.

pub mod codec;
pub mod messages;
pub mod parser;

pub use codec::{BinaryCodec, TICK_SIZE};
pub use messages::{
    CancelOrderMessage, MessageHeader, ModifyOrderMessage, MsgType, NewOrderMessage,
    PROTOCOL_VERSION,
};
pub use parser::{MessageParser, ParseError};
