use super::mean;

/// Simple moving average of the last `period` values.
///
/// Returns `None` when fewer than `period` values exist or `period` is 0.
pub fn sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    mean(&prices[prices.len() - period..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_sma() {
        assert_eq!(sma(&[1.0, 2.0], 3), None);
        let v = sma(&[1.0, 2.0, 3.0], 3).unwrap();
        assert!((v - 2.0).abs() < f64::EPSILON);
        let v = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert!((v - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn single_period_is_last_value() {
        assert_eq!(sma(&[42.0, 99.0], 1), Some(99.0));
    }

    #[test]
    fn zero_period_is_unavailable() {
        assert_eq!(sma(&[1.0, 2.0], 0), None);
    }
}
