pub mod access_token;
pub mod auth_bearer;
pub mod authenticator;
pub mod login_guard;
pub mod password;
