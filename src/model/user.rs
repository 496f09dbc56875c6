use chrono::{DateTime, Utc};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Premium,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            Self::User => "user",
            Self::Premium => "premium",
            Self::Admin => "admin",
        })
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    #[serde(default)]
    pub premium: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_end: Option<DateTime<Utc>>,
    pub referral_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_country: Option<String>,
    #[serde(default)]
    pub known_fingerprints: Vec<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_premium(&self, now: DateTime<Utc>) -> bool {
        self.is_admin() || (self.premium && self.subscription_end.is_some_and(|end| end > now))
    }

    /// Extends the subscription by `days` and grants premium.
    pub fn extend_subscription(&mut self, now: DateTime<Utc>, days: i64) {
        if !self.is_premium(now) || self.subscription_start.is_none() {
            self.subscription_start = Some(now);
        }
        self.subscription_end = Some(crate::utils::extend_from(self.subscription_end, now, days));
        self.premium = true;
        if self.role == Role::User {
            self.role = Role::Premium;
        }
    }

    /// Drops premium once the subscription ran out, returns true if changed.
    pub fn expire_subscription(&mut self, now: DateTime<Utc>) -> bool {
        if self.premium && self.subscription_end.is_none_or(|end| end <= now) {
            self.premium = false;
            if self.role == Role::Premium {
                self.role = Role::User;
            }
            return true;
        }
        false
    }
}

/// User as it leaves the api, without secrets.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub premium: bool,
    pub subscription_start: Option<DateTime<Utc>>,
    pub subscription_end: Option<DateTime<Utc>>,
    pub referral_code: String,
    pub created_at: DateTime<Utc>,
}

impl UserDto {
    pub fn from_user(user: &User, now: DateTime<Utc>) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role,
            premium: user.is_premium(now),
            subscription_start: user.subscription_start,
            subscription_end: user.subscription_end,
            referral_code: user.referral_code.clone(),
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{Role, User};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    pub(crate) fn test_user(id: &str, now: DateTime<Utc>) -> User {
        User {
            id: id.to_string(),
            email: format!("{id}@example.org"),
            username: id.to_string(),
            password_hash: String::new(),
            role: Role::User,
            premium: false,
            subscription_start: None,
            subscription_end: None,
            referral_code: format!("REF{id}").to_uppercase(),
            referred_by: None,
            created_at: now,
            last_login_at: None,
            last_country: None,
            known_fingerprints: vec![],
        }
    }

    #[test]
    fn test_extend_and_expire() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let mut user = test_user("anna", now);
        assert!(!user.is_premium(now));
        user.extend_subscription(now, 30);
        assert!(user.is_premium(now));
        assert_eq!(user.role, Role::Premium);
        assert_eq!(user.subscription_end, Some(now + Duration::days(30)));
        let later = now + Duration::days(31);
        assert!(!user.is_premium(later));
        assert!(user.expire_subscription(later));
        assert_eq!(user.role, Role::User);
        assert!(!user.expire_subscription(later));
    }

    #[test]
    fn test_serde_camel_case() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let json = serde_json::to_value(test_user("bob", now)).unwrap();
        assert!(json.get("passwordHash").is_some());
        assert!(json.get("referralCode").is_some());
        assert_eq!(json["role"], "user");
    }
}
