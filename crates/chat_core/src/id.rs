//! Unique, monotonic-enough string identifiers for messages and sessions.

use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn to_base36(mut n: u128) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).expect("base36 digits are ascii")
}

/// Generates an identifier made of the current unix-millis timestamp in
/// base 36 followed by a random base-36 suffix. Ids produced later sort
/// after ids produced in earlier milliseconds; the suffix disambiguates
/// ids minted within the same millisecond.
pub fn generate_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u128;
    let suffix: u64 = rand::thread_rng().r#gen();
    format!("{}{}", to_base36(millis), to_base36(suffix as u128))
}
