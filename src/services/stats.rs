pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population standard deviation.
pub fn std_dev(xs: &[f64]) -> f64 {
    let avg = mean(xs);
    let square_diffs: Vec<f64> = xs.iter().map(|x| (x - avg).powi(2)).collect();
    mean(&square_diffs).sqrt()
}

/// Fraction of `xs` strictly below `value`.
pub fn percentile_rank(value: f64, xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().filter(|x| **x < value).count() as f64 / xs.len() as f64
}

pub fn coefficient_of_variation(xs: &[f64]) -> f64 {
    let avg = mean(xs);
    if avg <= 0.0 {
        return 0.0;
    }
    std_dev(xs) / avg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn mean_matches_sum_over_len() {
        let xs = [1.5, 2.5, 3.0, 9.0];
        assert!((mean(&xs) - 16.0 / 4.0).abs() < 1e-12);
    }

    #[test]
    fn std_dev_is_population_not_sample() {
        // population sd of [2,4,4,4,5,5,7,9] is exactly 2
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((std_dev(&xs) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn std_dev_degenerate_inputs_are_zero() {
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[42.0]), 0.0);
        assert_eq!(std_dev(&[2.5, 2.5, 2.5]), 0.0);
    }

    #[test]
    fn std_dev_never_negative() {
        for xs in [vec![-5.0, 10.0], vec![0.1, 0.2, 0.3], vec![1e9, -1e9]] {
            assert!(std_dev(&xs) >= 0.0);
        }
    }

    #[test]
    fn percentile_of_minimum_is_zero() {
        let xs = [3.0, 1.0, 2.0, 5.0];
        assert_eq!(percentile_rank(1.0, &xs), 0.0);
    }

    #[test]
    fn percentile_above_all_is_one() {
        let xs = [3.0, 1.0, 2.0, 5.0];
        assert_eq!(percentile_rank(6.0, &xs), 1.0);
    }

    #[test]
    fn percentile_counts_strictly_less() {
        let xs = [1.0, 2.0, 2.0, 3.0];
        assert_eq!(percentile_rank(2.0, &xs), 0.25);
        assert_eq!(percentile_rank(1.0, &[]), 0.0);
    }

    #[test]
    fn coefficient_of_variation_guards_zero_mean() {
        assert_eq!(coefficient_of_variation(&[]), 0.0);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);
        assert!((coefficient_of_variation(&[1.0, 3.0]) - 0.5).abs() < 1e-12);
    }
}
