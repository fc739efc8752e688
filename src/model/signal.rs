use std::fmt;

use crate::indicator::IndicatorSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Bullish,
    Bearish,
    Warning,
    Neutral,
}

impl SignalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Warning => "warning",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub kind: SignalKind,
    pub source: &'static str,
    pub message: String,
}

impl Signal {
    pub fn new(kind: SignalKind, source: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            source,
            message: message.into(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind.as_str(), self.source, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl Action {
    /// Strong thresholds are checked before weak ones.
    pub fn from_strength(strength: i32) -> Self {
        if strength >= 3 {
            Self::StrongBuy
        } else if strength >= 1 {
            Self::Buy
        } else if strength <= -3 {
            Self::StrongSell
        } else if strength <= -1 {
            Self::Sell
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrongBuy => "STRONG_BUY",
            Self::Buy => "BUY",
            Self::Neutral => "NEUTRAL",
            Self::Sell => "SELL",
            Self::StrongSell => "STRONG_SELL",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one analysis pass. Superseded, never mutated, by the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub symbol: String,
    pub price: f64,
    pub sample_count: usize,
    pub indicators: IndicatorSet,
    pub signals: Vec<Signal>,
    pub trend_strength: i32,
    pub action: Action,
}
