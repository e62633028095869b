//! Random identifier generation.

use rand::Rng;

/// Length of the random part when callers have no preference.
pub const DEFAULT_ID_SIZE: usize = 16;

/// URL-safe alphabet; 64 symbols so every index is equally likely.
const ALPHABET: &[u8; 64] = b"_-0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Return `prefix` followed by `size` random URL-safe characters.
pub fn generate_id(prefix: &str, size: usize) -> String {
    let mut rng = rand::rng();
    let mut id = String::with_capacity(prefix.len() + size);
    id.push_str(prefix);
    id.extend((0..size).map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char));
    id
}
