use crate::streamhub_error::{StreamHubError, StreamHubErrorKind};
use crate::utils::{default_as_empty_list, default_token_ttl_mins};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebAuthConfig {
    pub issuer: String,
    pub secret: String,
    #[serde(default = "default_token_ttl_mins")]
    pub token_ttl_mins: u32,
    /// usernames which get the admin role on registration
    #[serde(default = "default_as_empty_list")]
    pub admin_users: Vec<String>,
}

impl WebAuthConfig {
    pub fn prepare(&mut self) -> Result<(), StreamHubError> {
        self.issuer = self.issuer.trim().to_string();
        if self.issuer.is_empty() {
            return Err(StreamHubError::new(StreamHubErrorKind::Info, "web_auth.issuer is required".to_string()));
        }
        if self.secret.trim().len() < 16 {
            return Err(StreamHubError::new(StreamHubErrorKind::Info, "web_auth.secret needs at least 16 characters".to_string()));
        }
        if self.token_ttl_mins == 0 {
            self.token_ttl_mins = default_token_ttl_mins();
        }
        self.admin_users = self.admin_users.iter().map(|u| u.trim().to_lowercase()).filter(|u| !u.is_empty()).collect();
        Ok(())
    }

    pub fn is_admin_user(&self, username: &str) -> bool {
        self.admin_users.iter().any(|u| u.eq_ignore_ascii_case(username))
    }
}
