//! Random-walk prices for subscribed instruments.

use rand::Rng;

/// Price increment. Prices are kept in whole ticks so they print cleanly.
pub const TICK_SIZE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub last_price: f64,
    pub bid_price1: f64,
    pub ask_price1: f64,
    pub volume: i64,
}

/// Per-instrument price state
#[derive(Debug, Clone)]
pub struct QuoteWalk {
    ticks: i64,
    volume: i64,
}

impl QuoteWalk {
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        Self {
            ticks: rng.gen_range(2_000..20_000),
            volume: 0,
        }
    }

    /// Move the price by at most two ticks and add some traded volume.
    pub fn step<R: Rng>(&mut self, rng: &mut R) -> Tick {
        self.ticks = (self.ticks + rng.gen_range(-2..=2)).max(2);
        self.volume += rng.gen_range(1..=20);
        Tick {
            last_price: self.ticks as f64 * TICK_SIZE,
            bid_price1: (self.ticks - 1) as f64 * TICK_SIZE,
            ask_price1: (self.ticks + 1) as f64 * TICK_SIZE,
            volume: self.volume,
        }
    }
}
