//! Display names for new connections.
//!
//! The name requested in the URL path is cleaned up and then gets four
//! random digits appended, so two people who both pick `piano` do not
//! show up under the same name. The hub still guarantees uniqueness on
//! top of this.

use rand::Rng;

/// Longest accepted name, before the random digits.
pub const MAX_NAME_CHARS: usize = 24;

/// Name used when nothing usable is left after cleaning.
pub const FALLBACK_NAME: &str = "guest";

/// Keep only ASCII alphanumerics, `-` and `_`, capped at
/// [`MAX_NAME_CHARS`].
pub fn sanitize(requested: &str) -> String {
    let cleaned: String = requested
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .take(MAX_NAME_CHARS)
        .collect();
    if cleaned.is_empty() {
        String::from(FALLBACK_NAME)
    } else {
        cleaned
    }
}

/// Sanitize `requested` and append four random digits.
pub fn disambiguate(requested: &str) -> String {
    disambiguate_with(requested, &mut rand::rng())
}

/// [`disambiguate`] with a caller-supplied random source.
pub fn disambiguate_with<R: Rng + ?Sized>(requested: &str, rng: &mut R) -> String {
    let digits: u16 = rng.random_range(0..10_000);
    format!("{}{digits:04}", sanitize(requested))
}
