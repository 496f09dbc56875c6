pub mod api_utils;
pub mod main_api;
mod middleware;
mod scheduler;
mod endpoints;

pub(crate) mod model;
