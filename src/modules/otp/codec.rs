use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

pub const OTP_LENGTH: usize = 6;
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Uniform over `000000..=999999`; leading zeros are kept.
pub fn generate() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", code)
}

/// Lowercase hex SHA-256 of `code` followed by `pepper`.
pub fn hash(code: &str, pepper: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hasher.update(pepper.as_bytes());
    base16ct::lower::encode_string(&hasher.finalize())
}

/// Compares two digests without short-circuiting on the first differing byte.
pub fn digests_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Storage key for an identifier: unpadded base64url of its UTF-8 bytes.
/// Existing records were keyed the same way, so this must not change.
pub fn encode_subject_key(identifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(identifier.as_bytes())
}

/// `"<uid>:<tag>"`, the identifier used for account-bound flows.
pub fn composite_subject(uid: &str, tag: &str) -> String {
    format!("{}:{}", uid, tag)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex"))
        .is_match(email)
}

pub fn is_valid_otp(code: &str) -> bool {
    code.len() == OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

pub fn is_password_strong(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
        && !password.contains(['\n', '\r'])
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_ascii_alphanumeric())
}
