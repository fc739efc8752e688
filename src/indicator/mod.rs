//! Pure indicator functions over a price series.
//!
//! Every function returns `None` below its minimum sample count. Insufficient
//! history is the normal state right after a (re)subscription, not a fault.

pub mod momentum;
pub mod rsi;
pub mod sma;
pub mod volatility;

pub use momentum::momentum;
pub use rsi::rsi;
pub use sma::sma;
pub use volatility::volatility;

use crate::model::tick::Tick;

/// Running mean `m += (x - m) / k`. Unlike sum-then-divide it never moves
/// once every value equals `m`, so a constant series yields that value exactly.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut m = 0.0;
    for (i, x) in values.iter().enumerate() {
        m += (x - m) / (i + 1) as f64;
    }
    Some(m)
}

pub const SMA_SHORT: usize = 20;
pub const SMA_LONG: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const VOLATILITY_PERIOD: usize = 20;
pub const MOMENTUM_PERIOD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorSet {
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub rsi14: Option<f64>,
    pub volatility20: Option<f64>,
    pub momentum10: Option<f64>,
}

impl IndicatorSet {
    pub fn compute(ticks: &[Tick]) -> Self {
        let prices: Vec<f64> = ticks.iter().map(|t| t.price).collect();
        Self::from_prices(&prices)
    }

    pub fn from_prices(prices: &[f64]) -> Self {
        Self {
            sma20: sma(prices, SMA_SHORT),
            sma50: sma(prices, SMA_LONG),
            rsi14: rsi(prices, RSI_PERIOD),
            volatility20: volatility(prices, VOLATILITY_PERIOD),
            momentum10: momentum(prices, MOMENTUM_PERIOD),
        }
    }
}
