pub mod file_utils;
pub mod file_lock_manager;
pub mod config_reader;
