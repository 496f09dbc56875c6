pub mod account_api;
pub mod admin_api;
pub mod ads_api;
pub mod analytics_api;
pub mod auth_api;
pub mod catalog_api;
pub mod moderation_api;
pub mod payment_api;
pub mod recording_api;
pub mod web_index;
