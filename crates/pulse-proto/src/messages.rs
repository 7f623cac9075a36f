//! Binary message definitions.
//!
//! All messages are packed little-endian layouts with no implicit
//! padding, so they can be copied to and from wire bytes directly.
//! Fields of packed structs must be copied to locals before use.

use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use pulse_core::{Order, OrderId, SymbolId};

/// Protocol version carried in every header.
pub const PROTOCOL_VERSION: u8 = 1;

/// Message type discriminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType {
    NewOrder = 0,
    CancelOrder = 1,
    ModifyOrder = 2,
}

impl TryFrom<u8> for MsgType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(MsgType::NewOrder),
            1 => Ok(MsgType::CancelOrder),
            2 => Ok(MsgType::ModifyOrder),
            _ => Err(()),
        }
    }
}

/// Fixed-size frame header (10 bytes).
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct MessageHeader {
    /// Total frame length in bytes, header included.
    pub msg_length: u64,
    pub msg_type: u8,
    pub version: u8,
}

const _: () = assert!(size_of::<MessageHeader>() == 10);

// SAFETY: packed plain-old-data, no padding bytes, any bit pattern valid.
unsafe impl Pod for MessageHeader {}
unsafe impl Zeroable for MessageHeader {}

impl MessageHeader {
    pub const fn new(msg_type: MsgType, msg_length: usize) -> Self {
        Self {
            msg_length: msg_length as u64,
            msg_type: msg_type as u8,
            version: PROTOCOL_VERSION,
        }
    }
}

/// New order submission (34 bytes).
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct NewOrderMessage {
    pub header: MessageHeader, // 10
    pub order_id: u64,         // 8
    pub symbol_id: u32,        // 4
    pub price_ticks: u32,      // 4
    pub quantity: u32,         // 4
    pub side: u8,              // 1
    pub order_type: u8,        // 1
    pub tif: u8,               // 1
    pub _pad: u8,              // 1
}

const _: () = assert!(size_of::<NewOrderMessage>() == 34);

// SAFETY: packed plain-old-data, no padding bytes, any bit pattern valid.
unsafe impl Pod for NewOrderMessage {}
unsafe impl Zeroable for NewOrderMessage {}

impl NewOrderMessage {
    pub fn new(
        order_id: u64,
        symbol_id: u32,
        price_ticks: u32,
        quantity: u32,
        side: u8,
        order_type: u8,
        tif: u8,
    ) -> Self {
        Self {
            header: MessageHeader::new(MsgType::NewOrder, size_of::<Self>()),
            order_id,
            symbol_id,
            price_ticks,
            quantity,
            side,
            order_type,
            tif,
            _pad: 0,
        }
    }

    /// Build the wire message for an internal order.
    pub fn from_order(order: &Order) -> Self {
        Self::new(
            order.order_id.0,
            order.symbol_id.0,
            order.price.ticks() as u32,
            order.quantity.raw(),
            order.side as u8,
            order.order_type as u8,
            order.tif as u8,
        )
    }
}

/// Cancel request (26 bytes).
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct CancelOrderMessage {
    pub header: MessageHeader, // 10
    pub order_id: u64,         // 8
    pub symbol_id: u32,        // 4
    pub _pad: u32,             // 4
}

const _: () = assert!(size_of::<CancelOrderMessage>() == 26);

// SAFETY: packed plain-old-data, no padding bytes, any bit pattern valid.
unsafe impl Pod for CancelOrderMessage {}
unsafe impl Zeroable for CancelOrderMessage {}

impl CancelOrderMessage {
    pub fn new(order_id: u64, symbol_id: u32) -> Self {
        Self {
            header: MessageHeader::new(MsgType::CancelOrder, size_of::<Self>()),
            order_id,
            symbol_id,
            _pad: 0,
        }
    }

    pub fn from_ids(order_id: OrderId, symbol_id: SymbolId) -> Self {
        Self::new(order_id.0, symbol_id.0)
    }
}

/// Modify request (34 bytes). Reserved: carried on the wire but
/// rejected by the parser.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct ModifyOrderMessage {
    pub header: MessageHeader, // 10
    pub order_id: u64,         // 8
    pub symbol_id: u32,        // 4
    pub new_price_ticks: u32,  // 4
    pub new_quantity: u32,     // 4
    pub _pad: u32,             // 4
}

const _: () = assert!(size_of::<ModifyOrderMessage>() == 34);

// SAFETY: packed plain-old-data, no padding bytes, any bit pattern valid.
unsafe impl Pod for ModifyOrderMessage {}
unsafe impl Zeroable for ModifyOrderMessage {}

impl ModifyOrderMessage {
    pub fn new(order_id: u64, symbol_id: u32, new_price_ticks: u32, new_quantity: u32) -> Self {
        Self {
            header: MessageHeader::new(MsgType::ModifyOrder, size_of::<Self>()),
            order_id,
            symbol_id,
            new_price_ticks,
            new_quantity,
            _pad: 0,
        }
    }
}
