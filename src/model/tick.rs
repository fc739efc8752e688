/// One timestamped price observation from the feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub epoch: u64,
    pub price: f64,
}

impl Tick {
    /// Returns `None` for non-finite prices so they never reach the window.
    pub fn new(epoch: u64, price: f64) -> Option<Self> {
        if !price.is_finite() {
            return None;
        }
        Some(Self { epoch, price })
    }

    /// Parse a venue quote (decimal string) into a tick.
    pub fn from_quote(epoch: u64, quote: &str) -> Option<Self> {
        let price = quote.trim().parse::<f64>().ok()?;
        Self::new(epoch, price)
    }
}
