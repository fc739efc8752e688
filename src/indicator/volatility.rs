use super::mean;

/// Population standard deviation of the last `period` prices.
pub fn volatility(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let tail = &prices[prices.len() - period..];
    let m = mean(tail)?;
    let variance = tail.iter().map(|p| (p - m).powi(2)).sum::<f64>() / period as f64;
    Some(variance.sqrt())
}
