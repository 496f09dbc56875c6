use log::error;
use rand::Rng;

use crate::streamhub_error::StreamHubError;

const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_MAX_LEN: usize = 128;
const MSG_PASSWORD_POLICY: &str = "Le mot de passe doit contenir au moins 8 caractères, une lettre et un chiffre";
const MSG_PIN_POLICY: &str = "Le code PIN doit contenir 4 à 6 chiffres";

pub fn hash_password(password: &str) -> Option<String> {
    let salt: [u8; 16] = rand::rng().random();
    match argon2::hash_encoded(password.as_bytes(), &salt, &argon2::Config::default()) {
        Ok(hash) => Some(hash),
        Err(err) => {
            error!("Failed to hash password {err}");
            None
        }
    }
}

pub fn verify_password(hash: &str, password: &[u8]) -> bool {
    argon2::verify_encoded(hash, password).unwrap_or(false)
}

pub fn check_password_policy(password: &str) -> Result<(), StreamHubError> {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len)
        || !password.chars().any(char::is_alphabetic)
        || !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(StreamHubError::validation(MSG_PASSWORD_POLICY));
    }
    Ok(())
}

pub fn check_pin_policy(pin: &str) -> Result<(), StreamHubError> {
    if (4..=6).contains(&pin.len()) && pin.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(StreamHubError::validation(MSG_PIN_POLICY))
    }
}

#[cfg(test)]
mod tests {
    use super::{check_password_policy, check_pin_policy, hash_password, verify_password};

    #[test]
    fn test_hash_verify() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, b"s3cret-pass"));
        assert!(!verify_password(&hash, b"wrong-pass1"));
        assert!(!verify_password("not a hash", b"s3cret-pass"));
    }

    #[test]
    fn test_policies() {
        assert!(check_password_policy("abcdefg1").is_ok());
        assert!(check_password_policy("abcdefgh").is_err());
        assert!(check_password_policy("a1").is_err());
        assert!(check_pin_policy("1234").is_ok());
        assert!(check_pin_policy("123").is_err());
        assert!(check_pin_policy("12a4").is_err());
    }
}
