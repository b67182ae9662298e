//! Random decision points of the annealer.
//!
//! Every stochastic branch (add vs remove, which trade, accept vs reject)
//! consumes one draw from a [`DecisionSource`]. Any `rand::Rng` is one, so
//! production runs pass a seeded `StdRng`; tests pass scripted draws.

use rand::Rng;

/// Source of uniform draws.
pub trait DecisionSource {
    /// Uniform draw in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform index in `[0, len)`. `len` must be non-zero.
    fn pick(&mut self, len: usize) -> usize;
}

impl<R: Rng + ?Sized> DecisionSource for R {
    fn unit(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn pick(&mut self, len: usize) -> usize {
        self.gen_range(0..len)
    }
}

/// Probability of moving to a neighbor whose profit differs by `delta`.
///
/// Improvements are always taken. Otherwise `exp(delta / temperature)`,
/// which underflows to 0 as the temperature freezes.
pub fn acceptance_probability(delta: f64, temperature: f64) -> f64 {
    if delta > 0.0 {
        1.0
    } else if temperature <= 0.0 {
        0.0
    } else {
        (delta / temperature).exp()
    }
}

/// Metropolis acceptance. Draws only when `delta <= 0`.
pub fn accept<D: DecisionSource + ?Sized>(delta: f64, temperature: f64, draws: &mut D) -> bool {
    if delta > 0.0 {
        return true;
    }
    draws.unit() < acceptance_probability(delta, temperature)
}

/// Draw `k` distinct items from `items`, uniformly, without replacement.
///
/// Partial Fisher–Yates over a copy; `k` must not exceed `items.len()`.
pub fn sample_without_replacement<D: DecisionSource + ?Sized>(
    items: &[usize],
    k: usize,
    draws: &mut D,
) -> Vec<usize> {
    let mut pool = items.to_vec();
    for i in 0..k {
        let j = i + draws.pick(pool.len() - i);
        pool.swap(i, j);
    }
    pool.truncate(k);
    pool
}


#[cfg(test)]
mod tests {
    use super::scripted::ScriptedDraws;
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn improvement_always_accepted_without_a_draw() {
        let mut draws = ScriptedDraws::new(&[], &[]);
        assert!(accept(1.0, 10.0, &mut draws));
        assert!(draws.exhausted());
    }

    #[test]
    fn worse_move_accepted_below_threshold() {
        // exp(-10 / 10) ≈ 0.3679
        let mut draws = ScriptedDraws::new(&[0.30, 0.40], &[]);
        assert!(accept(-10.0, 10.0, &mut draws));
        assert!(!accept(-10.0, 10.0, &mut draws));
    }

    #[test]
    fn equal_profit_is_always_accepted() {
        let mut draws = ScriptedDraws::new(&[0.999_999], &[]);
        assert!(accept(0.0, 1.0, &mut draws));
    }

    #[test]
    fn frozen_temperature_rejects_worse() {
        assert_eq!(acceptance_probability(-1.0, 0.0), 0.0);
        assert_eq!(acceptance_probability(-1e6, 1e-5), 0.0);
        let mut draws = ScriptedDraws::new(&[0.0], &[]);
        assert!(!accept(-1.0, 0.0, &mut draws));
    }

    #[test]
    fn probability_is_below_one_for_losses() {
        let p = acceptance_probability(-0.5, 100.0);
        assert!(p < 1.0 && p > 0.99);
    }

    #[test]
    fn sample_is_distinct_and_from_items() {
        let items: Vec<usize> = (10..30).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let sample = sample_without_replacement(&items, 8, &mut rng);
        assert_eq!(sample.len(), 8);
        let mut sorted = sample.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 8);
        assert!(sample.iter().all(|s| items.contains(s)));
    }

    #[test]
    fn scripted_sample_follows_fisher_yates() {
        // pool [5, 6, 7, 8]; pick 2 → swap(0, 2) → [7, 6, 5, 8]; pick 0 → swap(1, 1)
        let mut draws = ScriptedDraws::new(&[], &[2, 0]);
        let sample = sample_without_replacement(&[5, 6, 7, 8], 2, &mut draws);
        assert_eq!(sample, vec![7, 6]);
    }
}
