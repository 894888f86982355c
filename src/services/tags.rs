// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Friend-code (user tag) generation and reservation.
//!
//! Tags look like `USER#4821QK`: a fixed prefix, four digits (1000-9999) and
//! two uppercase letters, roughly 6.08M combinations. Uniqueness is enforced
//! by the `userTags` reservation keyspace, not by the profile collection.

use rand::Rng;

use crate::db::DocumentStore;
use crate::error::AppError;

pub const TAG_PREFIX: &str = "USER#";

/// Consecutive collisions tolerated before giving up.
pub const MAX_TAG_ATTEMPTS: u32 = 10;

/// Generate a random candidate tag.
pub fn generate_tag<R: Rng + ?Sized>(rng: &mut R) -> String {
    let digits: u16 = rng.gen_range(1000..=9999);
    let a = rng.gen_range(b'A'..=b'Z') as char;
    let b = rng.gen_range(b'A'..=b'Z') as char;
    format!("{}{}{}{}", TAG_PREFIX, digits, a, b)
}

/// Whether `tag` has the exact `USER#` + 4 digits + 2 uppercase letters shape.
pub fn is_valid_tag(tag: &str) -> bool {
    let Some(rest) = tag.strip_prefix(TAG_PREFIX) else {
        return false;
    };
    let bytes = rest.as_bytes();
    bytes.len() == 6
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4..].iter().all(u8::is_ascii_uppercase)
}

/// Normalize a user-typed friend code for lookup.
///
/// Trims and uppercases; rejects anything without the `USER#` prefix before
/// a query is made. Full shape validation is left to the exact-match lookup.
pub fn normalize_tag_query(raw: &str) -> Result<String, AppError> {
    let tag = raw.trim().to_uppercase();
    if !tag.starts_with(TAG_PREFIX) {
        return Err(AppError::BadRequest("Invalid friend code.".to_string()));
    }
    Ok(tag)
}

/// Reserve a fresh unique tag.
///
/// Each attempt is an atomic create-if-absent against `userTags/{tag}`. A
/// failed transaction is treated like a collision and a new candidate is
/// drawn; after [`MAX_TAG_ATTEMPTS`] in a row the allocation fails.
pub async fn allocate_unique_tag<R: Rng + Send + ?Sized>(
    store: &dyn DocumentStore,
    rng: &mut R,
) -> Result<String, AppError> {
    for attempt in 1..=MAX_TAG_ATTEMPTS {
        let candidate = generate_tag(rng);

        match store.reserve_tag(&candidate).await {
            Ok(true) => {
                tracing::debug!(tag = %candidate, attempt, "Reserved user tag");
                return Ok(candidate);
            }
            Ok(false) => {
                tracing::debug!(tag = %candidate, attempt, "User tag collision");
            }
            Err(e) => {
                tracing::warn!(tag = %candidate, attempt, error = %e, "User tag reservation failed");
            }
        }
    }

    Err(AppError::TagSpaceExhausted(MAX_TAG_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generated_tags_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let tag = generate_tag(&mut rng);
            assert!(is_valid_tag(&tag), "malformed tag {}", tag);
        }
    }

    #[test]
    fn rejects_malformed_tags() {
        for tag in [
            "USER#123AB",
            "USER#12345A",
            "USER#1234ab",
            "user#1234AB",
            "USER#1234ABC",
            "1234AB",
        ] {
            assert!(!is_valid_tag(tag), "{} should be invalid", tag);
        }
        assert!(is_valid_tag("USER#0042ZZ"));
    }

    #[test]
    fn normalizes_typed_friend_codes() {
        assert_eq!(normalize_tag_query("  user#1234ab ").unwrap(), "USER#1234AB");
        assert!(matches!(
            normalize_tag_query("1234AB"),
            Err(AppError::BadRequest(_))
        ));
    }
}
