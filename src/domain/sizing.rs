//! Live order sizing and stop price rounding.

/// Volume for a live market order: `balance * risk_fraction / price`,
/// floored to the venue's 0.01 lot step. `None` when no tradeable volume results.
pub fn order_volume(balance: f64, risk_fraction: f64, price: f64) -> Option<f64> {
    if price.is_nan() || balance.is_nan() || price <= 0.0 || balance <= 0.0 {
        return None;
    }
    let volume = (balance * risk_fraction / price * 100.0).floor() / 100.0;
    (volume > 0.0).then_some(volume)
}

/// Round down to 3 decimals; long stops never end up above the MA.
pub fn round_down_3dp(value: f64) -> f64 {
    (value * 1000.0).floor() / 1000.0
}

/// Round up to 3 decimals; short stops never end up below the MA.
pub fn round_up_3dp(value: f64) -> f64 {
    (value * 1000.0).ceil() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_is_floored_to_lot_step() {
        // 50000 * 0.01 / 2000 = 0.25
        assert_eq!(order_volume(50_000.0, 0.01, 2000.0), Some(0.25));
        // 10000 * 0.01 / 2345.6 = 0.0426.. → 0.04
        assert_eq!(order_volume(10_000.0, 0.01, 2345.6), Some(0.04));
    }

    #[test]
    fn too_small_or_bad_inputs_give_none() {
        assert_eq!(order_volume(100.0, 0.01, 2000.0), None);
        assert_eq!(order_volume(10_000.0, 0.01, 0.0), None);
        assert_eq!(order_volume(0.0, 0.01, 2000.0), None);
        assert_eq!(order_volume(10_000.0, 0.01, f64::NAN), None);
    }

    #[test]
    fn rounding_direction() {
        assert_eq!(round_down_3dp(2012.34567), 2012.345);
        assert_eq!(round_up_3dp(2012.34512), 2012.346);
        assert_eq!(round_down_3dp(2012.5), 2012.5);
    }
}
