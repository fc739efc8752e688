/// Percent change between the last price and the price `period` samples back
/// (`prices[len - period]`).
///
/// A zero base price is treated as unavailable instead of dividing by zero.
pub fn momentum(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let last = *prices.last()?;
    let base = prices[prices.len() - period];
    if base == 0.0 {
        return None;
    }
    let pct = (last - base) / base * 100.0;
    pct.is_finite().then_some(pct)
}
