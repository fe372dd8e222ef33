//! Identifier generation for entries and installations.
//!
//! Ids are time-prefixed with a random base36 suffix:
//! `text_1714764000123_k3f9a2q`. The millisecond prefix keeps ids roughly
//! sortable by creation time; the suffix makes collisions negligible at
//! human-driven capture rates. Uniqueness is probabilistic, not guaranteed.

use chrono::Utc;
use rand::Rng;

/// Length of the random base36 suffix.
const SUFFIX_LEN: usize = 7;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate an entry id with the given type prefix (`"text"`, `"image"`,
/// `"entry"`).
pub fn entry_id(prefix: &str) -> String {
    format!(
        "{}_{}_{}",
        prefix,
        Utc::now().timestamp_millis(),
        base36_suffix(SUFFIX_LEN)
    )
}

/// Generate an installation-scoped user id.
pub fn install_id() -> String {
    entry_id("user")
}

fn base36_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}
