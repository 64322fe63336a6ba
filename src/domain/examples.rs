use rand::{seq::SliceRandom, Rng};

pub const EXAMPLE_TEXTS: [&str; 4] = [
    "Congratulations!!! You won $1000 gift card, claim now.",
    "NASA launches rover to Mars successfully.",
    "SIX chances to win CASH! From 100 to 20,000 pounds txt> CSH11 and send to 87575. Cost 150p/day, 6days, 16+ TsandCs apply Reply HL 4 info",
    "Government announces new education policy today.",
];

pub fn random_example() -> &'static str {
    random_example_with(&mut rand::thread_rng())
}

pub fn random_example_with<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    EXAMPLE_TEXTS
        .choose(rng)
        .copied()
        .unwrap_or(EXAMPLE_TEXTS[0])
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn samples_stay_within_the_fixed_set_and_cover_it() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let text = random_example_with(&mut rng);
            assert!(EXAMPLE_TEXTS.contains(&text));
            seen.insert(text);
        }
        assert_eq!(seen.len(), EXAMPLE_TEXTS.len());
    }
}
