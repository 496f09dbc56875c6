mod default_utils;
mod json_utils;
mod sys_utils;
mod hash_utils;
mod string_utils;
mod time_utils;
mod constants;
pub mod file;
pub mod network;

#[macro_export]
macro_rules! debug_if_enabled {
    ($fmt:expr, $( $args:expr ),*) => {
        if log::log_enabled!(log::Level::Debug) {
            log::log!(log::Level::Debug, $fmt, $($args),*);
        }
    };

    ($txt:expr) => {
        if log::log_enabled!(log::Level::Debug) {
            log::log!(log::Level::Debug, $txt);
        }
    };
}

pub use debug_if_enabled;

pub use self::default_utils::*;
pub use self::json_utils::*;
pub use self::hash_utils::*;
pub use self::string_utils::*;
pub use self::time_utils::*;
pub use self::constants::*;
