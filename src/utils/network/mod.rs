pub mod request;
pub mod geo;
