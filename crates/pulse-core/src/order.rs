//! Order types and lifecycle.
//!
//! The `Order` struct is exactly 64 bytes to fit in a single cache line.

use std::mem::size_of;

use crate::fixed::{Price, Quantity};

/// Side of the order book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    /// Bid side (buyers).
    Buy = 0,
    /// Ask side (sellers).
    Sell = 1,
}

impl Side {
    /// The side an incoming order matches against.
    #[inline(always)]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    #[inline(always)]
    pub const fn is_buy(self) -> bool {
        matches!(self, Side::Buy)
    }
}

impl TryFrom<u8> for Side {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(Side::Buy),
            1 => Ok(Side::Sell),
            _ => Err(()),
        }
    }
}

/// Order type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OrderType {
    /// Executes at the limit price or better; residual may rest.
    Limit = 0,
    /// Executes against whatever is on the opposite side; never rests.
    Market = 1,
}

impl TryFrom<u8> for OrderType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(OrderType::Limit),
            1 => Ok(OrderType::Market),
            _ => Err(()),
        }
    }
}

/// Time-in-force policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TimeInForce {
    /// Good-til-cancelled: rests until filled or cancelled.
    Gtc = 0,
    /// Immediate-or-cancel: fill what is possible, cancel the rest.
    Ioc = 1,
    /// Fill-or-kill: fill entirely right now or reject.
    Fok = 2,
}

impl TryFrom<u8> for TimeInForce {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(TimeInForce::Gtc),
            1 => Ok(TimeInForce::Ioc),
            2 => Ok(TimeInForce::Fok),
            _ => Err(()),
        }
    }
}

/// Order lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OrderStatus {
    New = 0,
    Active = 1,
    PartiallyFilled = 2,
    Filled = 3,
    Cancelled = 4,
    Rejected = 5,
}

/// Unique order identifier.
///
/// Zero means "unassigned": the engine allocates an id on submit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct OrderId(pub u64);

impl OrderId {
    pub const UNSET: Self = Self(0);

    #[inline(always)]
    pub const fn is_set(self) -> bool {
        self.0 != 0
    }
}

/// Symbol identifier, resolved from the ticker at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SymbolId(pub u32);

/// A single order - exactly 64 bytes (one cache line).
///
/// Hot fields (touched on every match iteration) come first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C, align(64))]
pub struct Order {
    /// Limit price in ticks (ignored for market orders).
    pub price: Price, // 8
    /// Unique identifier.
    pub order_id: OrderId, // 8
    /// Engine-assigned monotonic event timestamp.
    pub timestamp_ns: u64, // 8
    /// Engine-assigned sequence number, the authoritative event order.
    pub sequence_id: u64, // 8
    /// Original quantity.
    pub quantity: Quantity, // 4
    /// Cumulative filled quantity, monotonically non-decreasing.
    pub filled_qty: Quantity, // 4
    /// Instrument.
    pub symbol_id: SymbolId, // 4
    pub side: Side,            // 1
    pub order_type: OrderType, // 1
    pub tif: TimeInForce,      // 1
    pub status: OrderStatus,   // 1
    _pad: [u8; 16],
}

const _: () = assert!(size_of::<Order>() == 64, "Order must be exactly 64 bytes");

impl Order {
    pub fn new(
        order_id: OrderId,
        symbol_id: SymbolId,
        side: Side,
        order_type: OrderType,
        tif: TimeInForce,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            price,
            order_id,
            timestamp_ns: 0,
            sequence_id: 0,
            quantity,
            filled_qty: Quantity::ZERO,
            symbol_id,
            side,
            order_type,
            tif,
            status: OrderStatus::New,
            _pad: [0; 16],
        }
    }

    /// Quantity still open. Never negative.
    #[inline(always)]
    pub fn remaining(&self) -> Quantity {
        self.quantity.saturating_sub(self.filled_qty)
    }

    #[inline(always)]
    pub fn is_filled(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Whether this order has finished its lifecycle.
    #[inline(always)]
    pub fn is_complete(&self) -> bool {
        matches!(self.status, OrderStatus::Filled | OrderStatus::Cancelled)
    }
}

impl Default for Order {
    fn default() -> Self {
        Self::new(
            OrderId::UNSET,
            SymbolId::default(),
            Side::Buy,
            OrderType::Limit,
            TimeInForce::Gtc,
            Price::ZERO,
            Quantity::ZERO,
        )
    }
}

/// A request consumed by the matching engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderRequest {
    New(Order),
    Cancel {
        order_id: OrderId,
        symbol_id: SymbolId,
    },
    /// Reserved. The wire carries it but the parser rejects it.
    Modify {
        order_id: OrderId,
        symbol_id: SymbolId,
        new_price: Price,
        new_quantity: Quantity,
    },
}

/// One execution between a resting maker and an incoming taker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TradeEvent {
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    /// Always the maker's price at the moment of the match.
    pub price: Price,
    pub quantity: Quantity,
    pub timestamp_ns: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit_order(qty: u32) -> Order {
        Order::new(
            OrderId(1),
            SymbolId(1),
            Side::Buy,
            OrderType::Limit,
            TimeInForce::Gtc,
            Price::from_ticks(10_000),
            Quantity(qty),
        )
    }

    #[test]
    fn order_is_one_cache_line() {
        assert_eq!(size_of::<Order>(), 64);
    }

    #[test]
    fn remaining_tracks_fills() {
        let mut order = limit_order(100);
        assert_eq!(order.remaining(), Quantity(100));

        order.filled_qty = Quantity(60);
        assert_eq!(order.remaining(), Quantity(40));

        order.filled_qty = Quantity(100);
        assert!(order.is_filled());

        // filled_qty beyond quantity still yields zero, not underflow
        order.filled_qty = Quantity(120);
        assert_eq!(order.remaining(), Quantity::ZERO);
    }

    #[test]
    fn side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn enum_bytes_round_trip() {
        assert_eq!(Side::try_from(0), Ok(Side::Buy));
        assert_eq!(Side::try_from(1), Ok(Side::Sell));
        assert!(Side::try_from(2).is_err());

        assert_eq!(OrderType::try_from(1), Ok(OrderType::Market));
        assert!(OrderType::try_from(9).is_err());

        assert_eq!(TimeInForce::try_from(2), Ok(TimeInForce::Fok));
        assert!(TimeInForce::try_from(3).is_err());
    }

    #[test]
    fn unset_order_id() {
        assert!(!OrderId::UNSET.is_set());
        assert!(OrderId(7).is_set());
    }
}
