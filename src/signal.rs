use thiserror::Error;

use crate::indicator::IndicatorSet;
use crate::model::signal::{Action, Recommendation, Signal, SignalKind};
use crate::model::tick::Tick;

pub const MIN_ANALYSIS_TICKS: usize = 20;

const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;
const MOMENTUM_THRESHOLD_PCT: f64 = 1.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("insufficient data: {have} ticks, need at least {need}")]
    InsufficientData { have: usize, need: usize },
}

/// Run every rule against a window snapshot and map the accumulated trend
/// strength to an action.
pub fn analyze(symbol: &str, ticks: &[Tick]) -> Result<Recommendation, AnalysisError> {
    let Some(last) = ticks.last().filter(|_| ticks.len() >= MIN_ANALYSIS_TICKS) else {
        return Err(AnalysisError::InsufficientData {
            have: ticks.len(),
            need: MIN_ANALYSIS_TICKS,
        });
    };

    let price = last.price;
    let indicators = IndicatorSet::compute(ticks);
    let (signals, trend_strength) = evaluate(price, &indicators);

    Ok(Recommendation {
        symbol: symbol.to_string(),
        price,
        sample_count: ticks.len(),
        indicators,
        signals,
        trend_strength,
        action: Action::from_strength(trend_strength),
    })
}

/// Rules run in fixed order: moving averages, RSI, momentum.
pub fn evaluate(price: f64, indicators: &IndicatorSet) -> (Vec<Signal>, i32) {
    let mut signals = Vec::new();
    let mut strength = 0;

    if let Some(sma20) = indicators.sma20 {
        let (signal, delta) = moving_average_signal(price, sma20, indicators.sma50);
        signals.push(signal);
        strength += delta;
    }

    if let Some(rsi) = indicators.rsi14 {
        let (signal, delta) = if rsi > RSI_OVERBOUGHT {
            (
                Signal::new(
                    SignalKind::Warning,
                    "RSI",
                    format!("overbought (RSI {:.1})", rsi),
                ),
                -1,
            )
        } else if rsi < RSI_OVERSOLD {
            (
                Signal::new(
                    SignalKind::Warning,
                    "RSI",
                    format!("oversold (RSI {:.1})", rsi),
                ),
                1,
            )
        } else {
            (
                Signal::new(SignalKind::Neutral, "RSI", format!("neutral (RSI {:.1})", rsi)),
                0,
            )
        };
        signals.push(signal);
        strength += delta;
    }

    if let Some(momentum) = indicators
        .momentum10
        .filter(|m| m.abs() > MOMENTUM_THRESHOLD_PCT)
    {
        if momentum > 0.0 {
            signals.push(Signal::new(
                SignalKind::Bullish,
                "Momentum",
                format!("positive momentum {:+.2}%", momentum),
            ));
            strength += 1;
        } else {
            signals.push(Signal::new(
                SignalKind::Bearish,
                "Momentum",
                format!("negative momentum {:+.2}%", momentum),
            ));
            strength -= 1;
        }
    }

    (signals, strength)
}

// The +/-2 branches need the long average; with only SMA20 the rule degrades
// to a price-vs-SMA20 comparison.
fn moving_average_signal(price: f64, sma20: f64, sma50: Option<f64>) -> (Signal, i32) {
    if let Some(sma50) = sma50 {
        if price > sma20 && sma20 > sma50 {
            return (
                Signal::new(
                    SignalKind::Bullish,
                    "MA",
                    "strong uptrend: price above SMA20 above SMA50",
                ),
                2,
            );
        }
        if price < sma20 && sma20 < sma50 {
            return (
                Signal::new(
                    SignalKind::Bearish,
                    "MA",
                    "strong downtrend: price below SMA20 below SMA50",
                ),
                -2,
            );
        }
    }
    if price > sma20 {
        (
            Signal::new(SignalKind::Bullish, "MA", "price above SMA20"),
            1,
        )
    } else {
        (
            Signal::new(SignalKind::Bearish, "MA", "price at or below SMA20"),
            -1,
        )
    }
}
