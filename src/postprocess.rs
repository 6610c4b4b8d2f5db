use ndarray::Array1;

/// Applies softmax to a 1D array (slice) and returns a new Array1<f32>.
pub fn softmax(slice: &Array1<f32>) -> Array1<f32> {
    let max_val = slice.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp_vals: Array1<f32> = slice.mapv(|x| (x - max_val).exp());
    let sum_exp: f32 = exp_vals.sum();
    exp_vals.mapv(|v| v / sum_exp)
}

pub fn argmax_and_max(scores: &Array1<f32>) -> (usize, f32) {
    scores
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(max_idx, max_val), (i, &val)| {
            if val > max_val { (i, val) } else { (max_idx, max_val) }
        })
}

/// Express a probability as a percentage in [0, 100] rounded to two decimals.
pub fn to_percentage(probability: f32) -> f64 {
    let pct = probability as f64 * 100.0;
    if pct.is_nan() {
        return 0.0;
    }
    round2(pct.clamp(0.0, 100.0))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn softmax_sums_to_one_and_keeps_order() {
        let probs = softmax(&array![2.0, 1.0, 0.1, -3.0]);
        assert!((probs.sum() - 1.0).abs() < 1e-6);
        assert_eq!(argmax_and_max(&probs).0, 0);
        assert!(probs[1] > probs[2]);
    }

    #[test]
    fn argmax_picks_first_of_ties() {
        assert_eq!(argmax_and_max(&array![0.1, 0.45, 0.45]), (1, 0.45));
    }

    #[test]
    fn percentage_is_rounded_to_two_decimals() {
        assert_eq!(to_percentage(0.82), 82.0);
        assert_eq!(to_percentage(0.123456), 12.35);
        assert_eq!(to_percentage(1.0), 100.0);
    }

    #[test]
    fn percentage_stays_in_range() {
        assert_eq!(to_percentage(1.7), 100.0);
        assert_eq!(to_percentage(-0.2), 0.0);
        assert_eq!(to_percentage(f32::NAN), 0.0);
        assert_eq!(to_percentage(f32::INFINITY), 100.0);
        assert_eq!(to_percentage(f32::NEG_INFINITY), 0.0);
    }
}
