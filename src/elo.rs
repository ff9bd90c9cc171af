//! Elo rating update (§6 of the spec): K-factor 32, reference 400.

/// Expected score of a player rated `rate` against an opponent rated
/// `opponent_rate`, per the standard logistic Elo formula.
pub fn expected_score(rate: i32, opponent_rate: i32, reference: i32) -> f64 {
    let exponent = f64::from(opponent_rate - rate) / f64::from(reference);
    1.0 / (1.0 + 10f64.powf(exponent))
}

/// Zero-sum rate change applied to the winner; the loser's change is its
/// negation. Rounds to the nearest integer, matching standard Elo practice.
pub fn winner_rate_change(winner_rate: i32, loser_rate: i32, k_factor: i32, reference: i32) -> i32 {
    let expected = expected_score(winner_rate, loser_rate, reference);
    (f64::from(k_factor) * (1.0 - expected)).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_ratings_yield_half_k_change() {
        let change = winner_rate_change(1500, 1500, 32, 400);
        assert_eq!(change, 16);
    }

    #[test]
    fn underdog_win_yields_larger_change() {
        let change = winner_rate_change(1400, 1600, 32, 400);
        assert!(change > 16);
    }

    #[test]
    fn favorite_win_yields_smaller_change() {
        let change = winner_rate_change(1600, 1400, 32, 400);
        assert!(change < 16);
    }

    #[test]
    fn expected_scores_sum_to_one() {
        let e1 = expected_score(1500, 1600, 400);
        let e2 = expected_score(1600, 1500, 400);
        assert!((e1 + e2 - 1.0).abs() < 1e-9);
    }
}
