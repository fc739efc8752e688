/// Relative strength index over the most recent `period` price deltas.
///
/// Both averages divide by `period`, not by the number of gaining or losing
/// deltas. Requires `period + 1` prices.
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let recent = &prices[prices.len() - (period + 1)..];
    let (gain_sum, loss_sum) = recent
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(gain, loss), delta| {
            if delta > 0.0 {
                (gain + delta, loss)
            } else {
                (gain, loss - delta)
            }
        });

    let avg_gain = gain_sum / period as f64;
    let avg_loss = loss_sum / period as f64;
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}
