use std::sync::LazyLock;

use regex::Regex;

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static USERNAME_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").unwrap());

/// Strips markup and control characters, trims and cuts the text to `max_len` chars.
pub fn sanitize_text(text: &str, max_len: usize) -> String {
    let without_tags = TAG_REGEX.replace_all(text, "");
    without_tags
        .chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .filter(|c| !matches!(c, '<' | '>'))
        .take(max_len)
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

pub fn is_valid_username(username: &str) -> bool {
    USERNAME_REGEX.is_match(username)
}

pub trait Capitalize {
    fn capitalize(&self) -> String;
}

impl Capitalize for &str {
    fn capitalize(&self) -> String {
        let mut chars = self.chars();
        chars.next().map_or_else(String::new, |first_char| first_char.to_uppercase().collect::<String>() + chars.as_str())
    }
}
