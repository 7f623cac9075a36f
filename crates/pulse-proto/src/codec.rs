//! Byte-level encode/decode for wire messages.
//!
//! Packed layouts have alignment 1, so decoding is an unaligned
//! `Pod` read after the length checks; encoding is a plain byte copy.

use std::mem::size_of;

use bytemuck::Pod;

use crate::parser::ParseError;

/// Default tick size for price conversion.
pub const TICK_SIZE: f64 = 0.01;

pub struct BinaryCodec;

impl BinaryCodec {
    /// Serialize a message to its wire bytes.
    pub fn encode<T: Pod>(msg: &T) -> Vec<u8> {
        bytemuck::bytes_of(msg).to_vec()
    }

    /// Decode a message of known type from the front of `data`.
    pub fn decode<T: Pod>(data: &[u8]) -> Result<T, ParseError> {
        let size = size_of::<T>();
        if data.len() < size {
            return Err(ParseError::BufferTooSmall);
        }
        Ok(bytemuck::pod_read_unaligned(&data[..size]))
    }

    /// Decode and validate the frame header.
    ///
    /// Fails when the buffer cannot hold a header, or when the frame
    /// declares more bytes than were supplied.
    pub fn parse_header(data: &[u8]) -> Result<crate::messages::MessageHeader, ParseError> {
        let header: crate::messages::MessageHeader = Self::decode(data)?;

        let declared = header.msg_length;
        if declared as usize > data.len() {
            return Err(ParseError::IncompleteFrame {
                declared,
                available: data.len(),
            });
        }

        Ok(header)
    }

    /// Convert wire ticks to a dollar price.
    #[inline(always)]
    pub fn ticks_to_price(ticks: u32, tick_size: f64) -> f64 {
        ticks as f64 * tick_size
    }

    /// Quantize a dollar price to wire ticks.
    #[inline(always)]
    pub fn price_to_ticks(price: f64, tick_size: f64) -> u32 {
        (price / tick_size).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{CancelOrderMessage, MsgType, NewOrderMessage};

    #[test]
    fn encode_decode_round_trip() {
        let msg = NewOrderMessage::new(7, 1, 10_050, 250, 1, 0, 2);
        let bytes = BinaryCodec::encode(&msg);
        assert_eq!(bytes.len(), 34);

        let decoded: NewOrderMessage = BinaryCodec::decode(&bytes).unwrap();
        let order_id = decoded.order_id;
        let price_ticks = decoded.price_ticks;
        let quantity = decoded.quantity;
        let side = decoded.side;
        let tif = decoded.tif;
        assert_eq!(order_id, 7);
        assert_eq!(price_ticks, 10_050);
        assert_eq!(quantity, 250);
        assert_eq!(side, 1);
        assert_eq!(tif, 2);
    }

    #[test]
    fn header_round_trip() {
        let msg = CancelOrderMessage::new(99, 3);
        let bytes = BinaryCodec::encode(&msg);

        let header = BinaryCodec::parse_header(&bytes).unwrap();
        let msg_type = header.msg_type;
        let length = header.msg_length;
        assert_eq!(msg_type, MsgType::CancelOrder as u8);
        assert_eq!(length, 26);
    }

    #[test]
    fn short_buffer_fails() {
        let buffer = [0u8; 4];
        assert!(matches!(
            BinaryCodec::parse_header(&buffer),
            Err(ParseError::BufferTooSmall)
        ));
    }

    #[test]
    fn overdeclared_length_fails() {
        let msg = CancelOrderMessage::new(99, 3);
        let mut bytes = BinaryCodec::encode(&msg);
        // Frame claims more bytes than supplied.
        bytes.truncate(20);

        match BinaryCodec::parse_header(&bytes) {
            Err(ParseError::IncompleteFrame {
                declared,
                available,
            }) => {
                assert_eq!(declared, 26);
                assert_eq!(available, 20);
            }
            other => panic!("expected IncompleteFrame, got {:?}", other),
        }
    }

    #[test]
    fn tick_conversion_round_trip() {
        for ticks in [0u32, 1, 9_999, 10_001, 65_535] {
            let price = BinaryCodec::ticks_to_price(ticks, TICK_SIZE);
            assert_eq!(BinaryCodec::price_to_ticks(price, TICK_SIZE), ticks);
        }
        assert_eq!(BinaryCodec::price_to_ticks(100.0, TICK_SIZE), 10_000);
        assert_eq!(BinaryCodec::ticks_to_price(10_000, TICK_SIZE), 100.0);
    }
}
