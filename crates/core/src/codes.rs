//! Verification artifact generation.
//!
//! Link tokens are UUID v4 strings (122 random bits from the OS-seeded thread
//! RNG). Numeric codes are a single uniform draw over `0..1_000_000`, rendered
//! with zero padding, so every 6-digit string is equally likely.

use rand::Rng;
use uuid::Uuid;

/// Number of digits in a verification code.
pub const CODE_LENGTH: usize = 6;

/// Size of the code space: `10^CODE_LENGTH`.
const CODE_SPACE: u32 = 1_000_000;

/// Generate an opaque, unguessable token id for link redemption.
pub fn generate_token_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a zero-padded 6-digit verification code.
pub fn generate_numeric_code() -> String {
    generate_numeric_code_with(&mut rand::rng())
}

/// Generate a code from the given RNG. Exposed so distribution tests can seed it.
pub fn generate_numeric_code_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    format_code(rng.random_range(0..CODE_SPACE))
}

fn format_code(value: u32) -> String {
    format!("{value:0width$}", width = CODE_LENGTH)
}

/// Whether `code` has the shape of a verification code (exactly 6 ASCII digits).
pub fn is_well_formed_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn token_ids_are_uuid_v4_and_distinct() {
        let a = generate_token_id();
        let b = generate_token_id();
        assert_ne!(a, b);

        let parsed = Uuid::parse_str(&a).expect("token id should be a UUID");
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..1_000 {
            let code = generate_numeric_code();
            assert!(is_well_formed_code(&code), "malformed code: {code}");
        }
    }

    #[test]
    fn padding_covers_both_ends_of_the_range() {
        assert_eq!(format_code(0), "000000");
        assert_eq!(format_code(42), "000042");
        assert_eq!(format_code(999_999), "999999");
    }

    #[test]
    fn draws_reach_the_top_of_the_range() {
        // A modulus-999999 draw can never produce 999999; a uniform draw over
        // the full space reaches the top decile readily.
        let mut rng = StdRng::seed_from_u64(7);
        let mut max = 0u32;
        let mut min = u32::MAX;
        let mut seen = HashSet::new();
        for _ in 0..200_000 {
            let code = generate_numeric_code_with(&mut rng);
            let value: u32 = code.parse().expect("code should be numeric");
            max = max.max(value);
            min = min.min(value);
            seen.insert(code);
        }
        assert!(max >= 999_000, "max draw {max} never approached 999999");
        assert!(min <= 1_000, "min draw {min} never approached 000000");
        assert!(seen.len() > 150_000, "too many repeats: {}", seen.len());
    }

    #[test]
    fn well_formed_rejects_other_shapes() {
        assert!(is_well_formed_code("482913"));
        assert!(!is_well_formed_code("48291"));
        assert!(!is_well_formed_code("4829130"));
        assert!(!is_well_formed_code("48a913"));
        assert!(!is_well_formed_code("４８２９１３"));
    }
}
