//! Entry identifier generation.
//!
//! Identifiers are drawn uniformly from the 62 ASCII letters and digits.
//! They are not secrets: the goal is to make collisions and casual
//! enumeration improbable, so no uniqueness check is made here. The store
//! refuses to overwrite, which catches the rare collision.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Number of distinct characters an identifier is drawn from.
pub const ALPHABET_SIZE: usize = 62;

/// Default identifier length.
pub const DEFAULT_ID_LENGTH: usize = 36;

/// Generates a random identifier of `len` characters using the
/// thread-local generator (seeded once per thread from the OS).
pub fn generate(len: usize) -> String {
    generate_with(&mut rand::thread_rng(), len)
}

/// Generates a random identifier of `len` characters from `rng`.
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}
