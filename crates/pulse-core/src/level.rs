//! Price level queue management.
//!
//! A price level holds every resting order at one price on one side,
//! as a FIFO queue threaded through the pool's intrusive prev/next
//! links: O(1) push at the tail, O(1) erase anywhere (cancels), O(1)
//! head access for matching.

use crate::fixed::Quantity;
use crate::pool::{OrderHandle, OrderPool};

/// A single price level in the order book.
#[derive(Clone, Copy, Debug)]
pub struct PriceLevel {
    /// Oldest order (matched first).
    head: OrderHandle,
    /// Newest order (arrivals append here).
    tail: OrderHandle,
    /// Cached sum of remaining quantity across the level.
    level_qty: Quantity,
    order_count: u32,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self {
            head: OrderHandle::INVALID,
            tail: OrderHandle::INVALID,
            level_qty: Quantity::ZERO,
            order_count: 0,
        }
    }

    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.order_count == 0
    }

    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.order_count as usize
    }

    #[inline(always)]
    pub const fn total_qty(&self) -> Quantity {
        self.level_qty
    }

    /// FIFO head, the next order to trade at this price.
    #[inline(always)]
    pub fn front(&self) -> Option<OrderHandle> {
        if self.head.is_valid() {
            Some(self.head)
        } else {
            None
        }
    }

    /// Append at the tail, preserving arrival order.
    ///
    /// Adds the order's remaining quantity to the level total.
    #[inline]
    pub fn push_back(&mut self, pool: &mut OrderPool, handle: OrderHandle) {
        let qty = pool.order(handle).remaining();

        if self.tail.is_valid() {
            pool.node_mut(self.tail).next = handle;
            pool.node_mut(handle).prev = self.tail;
        } else {
            self.head = handle;
        }
        self.tail = handle;

        self.order_count += 1;
        self.level_qty = self.level_qty.saturating_add(qty);
    }

    /// Unlink `handle` wherever it sits in the queue.
    ///
    /// Subtracts the order's remaining quantity from the level total,
    /// so a fully filled order (remaining zero) leaves the total
    /// untouched.
    #[inline]
    pub fn unlink(&mut self, pool: &mut OrderPool, handle: OrderHandle) {
        let (prev, next, qty) = {
            let node = pool.node(handle);
            (node.prev, node.next, node.order.remaining())
        };

        if prev.is_valid() {
            pool.node_mut(prev).next = next;
        } else {
            self.head = next;
        }
        if next.is_valid() {
            pool.node_mut(next).prev = prev;
        } else {
            self.tail = prev;
        }

        let node = pool.node_mut(handle);
        node.prev = OrderHandle::INVALID;
        node.next = OrderHandle::INVALID;

        self.order_count -= 1;
        self.level_qty = self.level_qty.saturating_sub(qty);
    }

    /// Reduce the cached total after a fill against the head order.
    #[inline(always)]
    pub fn reduce_qty(&mut self, qty: Quantity) {
        self.level_qty = self.level_qty.saturating_sub(qty);
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Price;
    use crate::order::{Order, OrderId, OrderType, Side, SymbolId, TimeInForce};

    fn insert(pool: &mut OrderPool, id: u64, qty: u32) -> OrderHandle {
        pool.insert(Order::new(
            OrderId(id),
            SymbolId(1),
            Side::Sell,
            OrderType::Limit,
            TimeInForce::Gtc,
            Price::from_ticks(10_000),
            Quantity(qty),
        ))
        .unwrap()
    }

    #[test]
    fn fifo_push_and_front() {
        let mut pool = OrderPool::with_capacity(16);
        let mut level = PriceLevel::new();

        let h1 = insert(&mut pool, 1, 100);
        let h2 = insert(&mut pool, 2, 200);
        let h3 = insert(&mut pool, 3, 300);

        level.push_back(&mut pool, h1);
        level.push_back(&mut pool, h2);
        level.push_back(&mut pool, h3);

        assert_eq!(level.len(), 3);
        assert_eq!(level.total_qty(), Quantity(600));
        assert_eq!(level.front(), Some(h1));

        level.unlink(&mut pool, h1);
        assert_eq!(level.front(), Some(h2));
        level.unlink(&mut pool, h2);
        assert_eq!(level.front(), Some(h3));
        level.unlink(&mut pool, h3);
        assert!(level.is_empty());
        assert_eq!(level.total_qty(), Quantity::ZERO);
    }

    #[test]
    fn unlink_from_middle() {
        let mut pool = OrderPool::with_capacity(16);
        let mut level = PriceLevel::new();

        let h1 = insert(&mut pool, 1, 10);
        let h2 = insert(&mut pool, 2, 20);
        let h3 = insert(&mut pool, 3, 30);
        level.push_back(&mut pool, h1);
        level.push_back(&mut pool, h2);
        level.push_back(&mut pool, h3);

        level.unlink(&mut pool, h2);
        assert_eq!(level.len(), 2);
        assert_eq!(level.total_qty(), Quantity(40));

        // FIFO order of the survivors is intact.
        assert_eq!(level.front(), Some(h1));
        assert_eq!(pool.node(h1).next, h3);
        assert_eq!(pool.node(h3).prev, h1);
    }

    #[test]
    fn unlink_tail_updates_tail() {
        let mut pool = OrderPool::with_capacity(16);
        let mut level = PriceLevel::new();

        let h1 = insert(&mut pool, 1, 10);
        let h2 = insert(&mut pool, 2, 20);
        level.push_back(&mut pool, h1);
        level.push_back(&mut pool, h2);

        level.unlink(&mut pool, h2);
        // New arrivals must append after h1, not after the unlinked h2.
        let h3 = insert(&mut pool, 3, 30);
        level.push_back(&mut pool, h3);
        assert_eq!(pool.node(h1).next, h3);
        assert_eq!(level.len(), 2);
    }

    #[test]
    fn filled_order_leaves_total_untouched() {
        let mut pool = OrderPool::with_capacity(16);
        let mut level = PriceLevel::new();

        let h1 = insert(&mut pool, 1, 100);
        level.push_back(&mut pool, h1);

        // Simulate a full fill: the level total is reduced as the
        // trade happens, then the exhausted order is unlinked.
        pool.order_mut(h1).filled_qty = Quantity(100);
        level.reduce_qty(Quantity(100));
        level.unlink(&mut pool, h1);

        assert!(level.is_empty());
        assert_eq!(level.total_qty(), Quantity::ZERO);
    }
}
