use chrono::{DateTime, Utc};

use crate::utils::{constant_time_eq, hex_decode, hex_encode};

// hex timestamp (16) + hex ttl (4) + hex signature (64)
const SIGNED_PART_LEN: usize = 84;

fn sign(secret: &[u8; 32], timestamp: i64, ttl_secs: u16, subject: &str, resource: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new_keyed(secret);
    hasher.update(&timestamp.to_le_bytes());
    hasher.update(&ttl_secs.to_le_bytes());
    hasher.update(subject.as_bytes());
    hasher.update(&[0]);
    hasher.update(resource.as_bytes());
    hasher.finalize()
}

/// Short lived token granting `subject` (a user id) access to one `resource`.
/// The resource is not part of the token, the verifier supplies it.
pub fn create_access_token(secret: &[u8; 32], ttl_secs: u16, subject: &str, resource: &str, now: DateTime<Utc>) -> String {
    let timestamp = now.timestamp();
    let signature = hex_encode(sign(secret, timestamp, ttl_secs, subject, resource).as_bytes());
    format!("{}{}{signature}.{subject}", hex_encode(&timestamp.to_le_bytes()), hex_encode(&ttl_secs.to_le_bytes()))
}

/// Returns the subject of a valid, unexpired token issued for `resource`.
pub fn verify_access_token(token_str: &str, secret: &[u8; 32], resource: &str, now: DateTime<Utc>) -> Option<String> {
    let (signed, subject) = token_str.split_once('.')?;
    if signed.len() != SIGNED_PART_LEN || subject.is_empty() {
        return None;
    }

    let timestamp = i64::from_le_bytes(hex_decode(signed.get(0..16)?)?.try_into().ok()?);
    if timestamp == 0 {
        return None;
    }
    let ttl_secs = u16::from_le_bytes(hex_decode(signed.get(16..20)?)?.try_into().ok()?);
    let signature = hex_decode(signed.get(20..)?)?;

    let age = now.timestamp() - timestamp;
    if age < 0 || age > i64::from(ttl_secs) {
        return None;
    }

    let expected = sign(secret, timestamp, ttl_secs, subject, resource);
    constant_time_eq(expected.as_bytes(), &signature).then(|| subject.to_string())
}

#[cfg(test)]
mod tests {
    use crate::auth::access_token::{create_access_token, verify_access_token};
    use chrono::{Duration, Utc};

    #[test]
    fn test_valid_token() {
        let secret = b"37c30f739e83ba27b4c17b174c31f3a9";
        let now = Utc::now();
        let token = create_access_token(secret, 60, "user-1", "movie/m1", now);
        assert_eq!(verify_access_token(&token, secret, "movie/m1", now + Duration::seconds(30)), Some("user-1".to_string()));
        assert_eq!(verify_access_token(&token, secret, "movie/m1", now + Duration::seconds(61)), None);
        assert_eq!(verify_access_token(&token, secret, "movie/m2", now), None);
        assert_eq!(verify_access_token(&token, secret, "playlist", now), None);
    }

    #[test]
    fn test_tampered_token() {
        let secret = b"37c30f739e83ba27b4c17b174c31f3a9";
        let now = Utc::now();
        let token = create_access_token(secret, 60, "user-1", "playlist", now);
        let forged = token.replace(".user-1", ".user-2");
        assert_eq!(verify_access_token(&forged, secret, "playlist", now), None);
        assert_eq!(verify_access_token(&token, b"00000000000000000000000000000000", "playlist", now), None);
        assert_eq!(verify_access_token("short.user-1", secret, "playlist", now), None);
    }
}
