//! Random room codes.

use breachline_protocol::RoomCode;
use rand::Rng;

/// Draws a room code from the thread-local RNG.
///
/// Every position is drawn independently and uniformly from
/// [`RoomCode::ALPHABET`]. Uniqueness is not guaranteed; callers handle
/// collisions.
pub fn generate_code() -> RoomCode {
    generate_code_with(&mut rand::rng())
}

/// Draws a room code from `rng`.
pub fn generate_code_with<R: Rng>(rng: &mut R) -> RoomCode {
    let mut indices = [0_usize; RoomCode::LENGTH];
    for index in &mut indices {
        *index = rng.random_range(0..RoomCode::ALPHABET.len());
    }
    RoomCode::from_alphabet_indices(indices)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_generate_code_parses_back() {
        for _ in 0..1_000 {
            let code = generate_code();
            assert_eq!(RoomCode::parse(code.as_str()).unwrap(), code);
        }
    }

    #[test]
    fn test_generate_code_uses_whole_alphabet_evenly() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = [0_u32; 256];
        let draws = 20_000;
        for _ in 0..draws {
            for b in generate_code_with(&mut rng).as_str().bytes() {
                counts[usize::from(b)] += 1;
            }
        }

        let expected = f64::from(draws * RoomCode::LENGTH as u32) / RoomCode::ALPHABET.len() as f64;
        for &symbol in RoomCode::ALPHABET {
            let seen = f64::from(counts[usize::from(symbol)]);
            assert!(
                (seen - expected).abs() < expected * 0.1,
                "symbol {} drawn {seen} times, expected about {expected}",
                char::from(symbol)
            );
        }
    }

    proptest! {
        #[test]
        fn prop_generated_codes_are_well_formed(seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let code = generate_code_with(&mut rng);
            prop_assert_eq!(code.as_str().len(), RoomCode::LENGTH);
            prop_assert!(code.as_str().bytes().all(|b| RoomCode::ALPHABET.contains(&b)));
            prop_assert!(!code.as_str().contains('O'));
            prop_assert!(!code.as_str().contains('0'));
        }
    }
}
