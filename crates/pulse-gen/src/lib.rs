//! Synthetic order-flow generator.
//!
//! Draws order requests from pseudorandom distributions: a
//! tick-quantized normal price around a slowly drifting mid, Poisson
//! quantities, a 70/25/5 new/cancel/modify action mix (modify falls
//! back to cancel), and an 80/15/5 GTC/IOC/FOK time-in-force mix.
//! The RNG is seedable so test runs are reproducible.

use pulse_core::{
    Order, OrderId, OrderRequest, OrderType, Price, Quantity, Side, SymbolId, TimeInForce,
};
use rand::distributions::{Bernoulli, Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Exp, Normal, Poisson};

/// Generator tunables. The defaults mirror a quiet mid-cap tape.
#[derive(Clone, Copy, Debug)]
pub struct FlowParams {
    /// Starting mid price in dollars.
    pub initial_mid: f64,
    /// Tick size in dollars.
    pub tick_size: f64,
    /// Std-dev of the price draw around the mid.
    pub price_sigma: f64,
    /// Mean order quantity.
    pub mean_qty: f64,
    /// Exponential rate for inter-arrival times (events per ms).
    pub arrival_rate: f64,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            initial_mid: 100.0,
            tick_size: 0.01,
            price_sigma: 0.5,
            mean_qty: 100.0,
            arrival_rate: 100.0,
        }
    }
}

/// Pseudorandom order-request source for one symbol.
pub struct OrderFlowGenerator {
    rng: ChaCha8Rng,

    price_dist: Normal<f64>,
    qty_dist: Poisson<f64>,
    side_dist: Bernoulli,
    action_dist: WeightedIndex<u32>,
    tif_dist: WeightedIndex<u32>,
    arrival_dist: Exp<f64>,

    /// Ids of orders issued and not yet cancelled, for cancel targets.
    live_ids: Vec<OrderId>,

    mid_price: f64,
    params: FlowParams,
    symbol_id: SymbolId,
    next_order_id: u64,

    generated: u64,
    cancels: u64,
}

impl OrderFlowGenerator {
    /// Deterministic generator for the given seed.
    pub fn new(symbol_id: SymbolId, seed: u64) -> Self {
        Self::with_params(symbol_id, FlowParams::default(), seed)
    }

    /// Generator seeded from OS entropy.
    pub fn from_entropy(symbol_id: SymbolId) -> Self {
        Self::with_params(symbol_id, FlowParams::default(), rand::thread_rng().gen())
    }

    pub fn with_params(symbol_id: SymbolId, params: FlowParams, seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            price_dist: Normal::new(params.initial_mid, params.price_sigma)
                .expect("sigma is finite and positive"),
            qty_dist: Poisson::new(params.mean_qty).expect("mean qty is finite and positive"),
            side_dist: Bernoulli::new(0.5).expect("0.5 is a valid probability"),
            action_dist: WeightedIndex::new([70u32, 25, 5]).expect("weights are non-zero"),
            tif_dist: WeightedIndex::new([80u32, 15, 5]).expect("weights are non-zero"),
            arrival_dist: Exp::new(params.arrival_rate).expect("rate is finite and positive"),
            live_ids: Vec::new(),
            mid_price: params.initial_mid,
            params,
            symbol_id,
            next_order_id: 1_000,
            generated: 0,
            cancels: 0,
        }
    }

    /// Draw the next request.
    pub fn next_request(&mut self) -> OrderRequest {
        if self.generated % 100 == 0 {
            self.drift_mid();
        }

        match self.action_dist.sample(&mut self.rng) {
            0 => self.new_order(),
            1 => self.cancel_order(),
            // Modify is reserved downstream; fall back to a cancel.
            _ => self.cancel_order(),
        }
    }

    /// Draw several requests at once.
    pub fn burst(&mut self, count: usize) -> Vec<OrderRequest> {
        (0..count).map(|_| self.next_request()).collect()
    }

    /// Inter-arrival delay for the request just drawn, in microseconds.
    pub fn next_arrival_micros(&mut self) -> u64 {
        (self.arrival_dist.sample(&mut self.rng) * 1_000.0) as u64
    }

    pub fn generated(&self) -> u64 {
        self.generated
    }

    pub fn cancels(&self) -> u64 {
        self.cancels
    }

    fn drift_mid(&mut self) {
        let drift = Normal::new(0.0, 0.1).expect("sigma is finite and positive");
        self.mid_price += drift.sample(&mut self.rng);
        self.mid_price = self.mid_price.max(self.params.tick_size);
        self.price_dist = Normal::new(self.mid_price, self.params.price_sigma)
            .expect("sigma is finite and positive");
    }

    fn new_order(&mut self) -> OrderRequest {
        let tick = self.params.tick_size;

        let raw_price = self.price_dist.sample(&mut self.rng);
        let mut price = (raw_price / tick).round() * tick;

        let side = if self.side_dist.sample(&mut self.rng) {
            Side::Buy
        } else {
            Side::Sell
        };

        // Shade passive: buys below the draw, sells above, by 1-5 ticks.
        let shade = tick * (1 + self.rng.gen_range(0..5)) as f64;
        match side {
            Side::Buy => price -= shade,
            Side::Sell => price += shade,
        }
        price = price.max(tick);

        let quantity = (self.qty_dist.sample(&mut self.rng) as u32).max(1);

        let tif = match self.tif_dist.sample(&mut self.rng) {
            0 => TimeInForce::Gtc,
            1 => TimeInForce::Ioc,
            _ => TimeInForce::Fok,
        };

        let order_id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        self.live_ids.push(order_id);
        self.generated += 1;

        let order = Order::new(
            order_id,
            self.symbol_id,
            side,
            OrderType::Limit,
            tif,
            Price::from_ticks((price / tick).round() as u64),
            Quantity(quantity),
        );

        OrderRequest::New(order)
    }

    fn cancel_order(&mut self) -> OrderRequest {
        if self.live_ids.is_empty() {
            return self.new_order();
        }

        let idx = self.rng.gen_range(0..self.live_ids.len());
        let order_id = self.live_ids.swap_remove(idx);
        self.cancels += 1;

        OrderRequest::Cancel {
            order_id,
            symbol_id: self.symbol_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_under_seed() {
        let mut a = OrderFlowGenerator::new(SymbolId(1), 42);
        let mut b = OrderFlowGenerator::new(SymbolId(1), 42);

        for _ in 0..1_000 {
            match (a.next_request(), b.next_request()) {
                (OrderRequest::New(x), OrderRequest::New(y)) => {
                    assert_eq!(x.order_id, y.order_id);
                    assert_eq!(x.price, y.price);
                    assert_eq!(x.quantity, y.quantity);
                    assert_eq!(x.side, y.side);
                    assert_eq!(x.tif, y.tif);
                }
                (
                    OrderRequest::Cancel { order_id: x, .. },
                    OrderRequest::Cancel { order_id: y, .. },
                ) => assert_eq!(x, y),
                other => panic!("diverged: {:?}", other),
            }
        }
    }

    #[test]
    fn orders_are_tick_aligned_and_positive() {
        let mut gen = OrderFlowGenerator::new(SymbolId(1), 7);

        for request in gen.burst(5_000) {
            if let OrderRequest::New(order) = request {
                assert!(order.price.ticks() >= 1);
                assert!(order.quantity.raw() >= 1);
                assert_eq!(order.order_type, OrderType::Limit);
            }
        }
    }

    #[test]
    fn action_mix_is_roughly_70_30() {
        let mut gen = OrderFlowGenerator::new(SymbolId(1), 11);
        let mut news = 0u32;
        let mut cancels = 0u32;

        for _ in 0..10_000 {
            match gen.next_request() {
                OrderRequest::New(_) => news += 1,
                OrderRequest::Cancel { .. } => cancels += 1,
                OrderRequest::Modify { .. } => panic!("generator never emits modify"),
            }
        }

        // 70% new plus cancel fallbacks when nothing is live.
        assert!(news > 6_500, "news={}", news);
        assert!(cancels > 2_000, "cancels={}", cancels);
    }

    #[test]
    fn tif_mix_has_all_variants() {
        let mut gen = OrderFlowGenerator::new(SymbolId(1), 13);
        let mut gtc = 0u32;
        let mut ioc = 0u32;
        let mut fok = 0u32;

        for _ in 0..10_000 {
            if let OrderRequest::New(order) = gen.next_request() {
                match order.tif {
                    TimeInForce::Gtc => gtc += 1,
                    TimeInForce::Ioc => ioc += 1,
                    TimeInForce::Fok => fok += 1,
                }
            }
        }

        assert!(gtc > ioc && ioc > fok, "gtc={} ioc={} fok={}", gtc, ioc, fok);
        assert!(fok > 0);
    }

    #[test]
    fn cancels_target_previously_issued_ids() {
        let mut gen = OrderFlowGenerator::new(SymbolId(1), 17);
        let mut issued = std::collections::HashSet::new();

        for _ in 0..5_000 {
            match gen.next_request() {
                OrderRequest::New(order) => {
                    assert!(issued.insert(order.order_id), "duplicate id issued");
                }
                OrderRequest::Cancel { order_id, .. } => {
                    assert!(issued.contains(&order_id), "cancel of unknown id");
                }
                OrderRequest::Modify { .. } => unreachable!(),
            }
        }
    }

    #[test]
    fn arrival_times_are_sane() {
        let mut gen = OrderFlowGenerator::new(SymbolId(1), 19);
        let mut total = 0u64;
        for _ in 0..1_000 {
            let us = gen.next_arrival_micros();
            assert!(us < 1_000_000, "arrival {}us is implausible", us);
            total += us;
        }
        // Mean should land near 10us for the default rate.
        assert!(total / 1_000 < 1_000);
    }
}
