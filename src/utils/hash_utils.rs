use std::fmt::Write;

use base64::engine::general_purpose;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut output, b| {
        let _ = write!(output, "{b:02x}");
        output
    })
}

pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| hex.get(i..i + 2).and_then(|s| u8::from_str_radix(s, 16).ok()))
        .collect()
}

pub fn sha256_hex(text: &str) -> String {
    hex_encode(&Sha256::digest(text.as_bytes()))
}

pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn generate_secret() -> [u8; 32] {
    let mut rng = rand::rng();
    let mut secret = [0u8; 32];
    rng.fill(&mut secret);
    secret
}

/// Random url safe token with `bytes` bytes of entropy.
pub fn generate_token(bytes: usize) -> String {
    let mut rng = rand::rng();
    let data: Vec<u8> = (0..bytes).map(|_| rng.random::<u8>()).collect();
    general_purpose::URL_SAFE_NO_PAD.encode(data)
}

/// Random code out of an unambiguous upper case alphabet, grouped by `-`.
pub fn generate_code(groups: usize, group_len: usize) -> String {
    let mut rng = rand::rng();
    (0..groups)
        .map(|_| (0..group_len)
            .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
            .collect::<String>())
        .collect::<Vec<String>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::{constant_time_eq, generate_code, hex_decode, hex_encode, sha256_hex};

    #[test]
    fn test_sha256() {
        assert_eq!(sha256_hex("abc"), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }

    #[test]
    fn test_hex() {
        let bytes = [0u8, 15, 255, 16];
        assert_eq!(hex_decode(&hex_encode(&bytes)), Some(bytes.to_vec()));
        assert_eq!(hex_decode("abc"), None);
        assert_eq!(hex_decode("zz"), None);
    }

    #[test]
    fn test_code() {
        let code = generate_code(3, 4);
        assert_eq!(code.len(), 14);
        assert_eq!(code.split('-').count(), 3);
        assert!(constant_time_eq(code.as_bytes(), code.as_bytes()));
    }
}
