pub mod config;
mod config_web_auth;
mod config_log;
mod config_messaging;
mod config_security;
mod config_ads;
mod config_payment;
mod config_recording;
pub mod user;
mod catalog;
mod payment;
mod access_code;
mod referral;
mod ads;
mod moderation;
mod parental;
mod terms;
mod recording;
mod analytics;

pub use self::config_web_auth::*;
pub use self::config_log::*;
pub use self::config_messaging::*;
pub use self::config_security::*;
pub use self::config_ads::*;
pub use self::config_payment::*;
pub use self::config_recording::*;
pub use self::user::*;
pub use self::catalog::*;
pub use self::payment::*;
pub use self::access_code::*;
pub use self::referral::*;
pub use self::ads::*;
pub use self::moderation::*;
pub use self::parental::*;
pub use self::terms::*;
pub use self::recording::*;
pub use self::analytics::*;
