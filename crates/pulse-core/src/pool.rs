//! Pre-allocated order node storage.
//!
//! Every resting order lives in one contiguous slab allocated at
//! startup; nothing on the matching path touches the allocator.
//! Handles are u32 indices into the slab. The free list is LIFO so a
//! just-released slot is reused while still cache-warm.
//!
//! A handle stays valid until the order it names leaves the book;
//! the book releases the slot and drops its id-index entry in the
//! same operation, so no stale handle can be observed.

use crate::order::Order;

/// Index into the order pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct OrderHandle(pub u32);

impl OrderHandle {
    pub const INVALID: Self = Self(u32::MAX);

    #[inline(always)]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }

    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for OrderHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

/// One slab slot: the order plus its FIFO linkage within a price level.
#[derive(Clone, Copy, Debug)]
pub struct OrderNode {
    pub order: Order,
    /// Previous order at the same price level (towards the head).
    pub prev: OrderHandle,
    /// Next order at the same price level (towards the tail).
    pub next: OrderHandle,
}

impl OrderNode {
    fn vacant() -> Self {
        Self {
            order: Order::default(),
            prev: OrderHandle::INVALID,
            next: OrderHandle::INVALID,
        }
    }
}

/// Fixed-capacity order slab with a LIFO free list.
pub struct OrderPool {
    nodes: Vec<OrderNode>,
    free_list: Vec<u32>,
    active_count: u32,
}

impl OrderPool {
    /// Create a pool holding up to `capacity` orders.
    ///
    /// # Panics
    /// Panics if `capacity` is not a power of 2 or does not fit a u32.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "capacity must be a power of 2");
        assert!(capacity < u32::MAX as usize, "capacity too large");

        let nodes = vec![OrderNode::vacant(); capacity];
        let free_list: Vec<u32> = (0..capacity as u32).rev().collect();

        Self {
            nodes,
            free_list,
            active_count: 0,
        }
    }

    /// Claim a slot and store `order` in it.
    ///
    /// Returns `None` when the pool is exhausted.
    #[inline]
    pub fn insert(&mut self, order: Order) -> Option<OrderHandle> {
        let idx = self.free_list.pop()?;
        self.active_count += 1;

        let node = &mut self.nodes[idx as usize];
        node.order = order;
        node.prev = OrderHandle::INVALID;
        node.next = OrderHandle::INVALID;

        Some(OrderHandle(idx))
    }

    /// Return a slot to the free list.
    #[inline]
    pub fn release(&mut self, handle: OrderHandle) {
        debug_assert!(handle.index() < self.nodes.len(), "handle out of bounds");
        debug_assert!(self.active_count > 0, "release without matching insert");

        self.nodes[handle.index()] = OrderNode::vacant();
        self.free_list.push(handle.0);
        self.active_count -= 1;
    }

    #[inline(always)]
    pub fn node(&self, handle: OrderHandle) -> &OrderNode {
        &self.nodes[handle.index()]
    }

    #[inline(always)]
    pub fn node_mut(&mut self, handle: OrderHandle) -> &mut OrderNode {
        &mut self.nodes[handle.index()]
    }

    #[inline(always)]
    pub fn order(&self, handle: OrderHandle) -> &Order {
        &self.nodes[handle.index()].order
    }

    #[inline(always)]
    pub fn order_mut(&mut self, handle: OrderHandle) -> &mut Order {
        &mut self.nodes[handle.index()].order
    }

    #[inline(always)]
    pub fn active(&self) -> usize {
        self.active_count as usize
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.free_list.is_empty()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.active_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{Price, Quantity};
    use crate::order::{OrderId, OrderType, Side, SymbolId, TimeInForce};

    fn sample_order(id: u64) -> Order {
        Order::new(
            OrderId(id),
            SymbolId(1),
            Side::Buy,
            OrderType::Limit,
            TimeInForce::Gtc,
            Price::from_ticks(10_000),
            Quantity(100),
        )
    }

    #[test]
    fn insert_and_release() {
        let mut pool = OrderPool::with_capacity(16);
        assert_eq!(pool.capacity(), 16);
        assert!(pool.is_empty());

        let h1 = pool.insert(sample_order(1)).unwrap();
        let h2 = pool.insert(sample_order(2)).unwrap();
        assert_eq!(pool.active(), 2);
        assert_eq!(pool.order(h1).order_id, OrderId(1));
        assert_eq!(pool.order(h2).order_id, OrderId(2));

        pool.release(h1);
        assert_eq!(pool.active(), 1);

        // LIFO: the freed slot is reused first.
        let h3 = pool.insert(sample_order(3)).unwrap();
        assert_eq!(h3, h1);
        assert_eq!(pool.order(h3).order_id, OrderId(3));
    }

    #[test]
    fn exhaustion() {
        let mut pool = OrderPool::with_capacity(4);
        for i in 0..4 {
            assert!(pool.insert(sample_order(i)).is_some());
        }
        assert!(pool.is_full());
        assert!(pool.insert(sample_order(99)).is_none());
    }

    #[test]
    fn released_node_is_cleared() {
        let mut pool = OrderPool::with_capacity(4);
        let h = pool.insert(sample_order(42)).unwrap();
        pool.node_mut(h).next = OrderHandle(3);
        pool.release(h);

        let h2 = pool.insert(sample_order(43)).unwrap();
        assert_eq!(h2, h);
        assert_eq!(pool.node(h2).next, OrderHandle::INVALID);
        assert_eq!(pool.node(h2).prev, OrderHandle::INVALID);
    }
}
