use std::fs;
use std::path::PathBuf;

use log::error;
use path_clean::PathClean;

use crate::utils::{CONFIG_FILE, CONFIG_PATH};

pub fn get_exe_path() -> PathBuf {
    let default_path = std::path::PathBuf::from("./");
    let current_exe = std::env::current_exe();
    match current_exe {
        Ok(exe) => {
            match fs::read_link(&exe) {
                Ok(f) => f.parent().map_or(default_path, std::path::Path::to_path_buf),
                Err(_) => exe.parent().map_or(default_path, std::path::Path::to_path_buf)
            }
        }
        Err(_) => default_path
    }
}

pub fn get_default_config_file_path() -> String {
    let exe_config = get_exe_path().join(CONFIG_PATH).join(CONFIG_FILE);
    if exe_config.exists() {
        return exe_config.to_string_lossy().to_string();
    }
    PathBuf::from(CONFIG_PATH).join(CONFIG_FILE).to_string_lossy().to_string()
}

/// Resolves `dir` against `base` and creates it when missing.
pub fn prepare_directory(base: &str, dir: &str) -> Result<PathBuf, std::io::Error> {
    let path = make_absolute_path(dir, base);
    if !path.exists() {
        fs::create_dir_all(&path)?;
    }
    if path.is_dir() {
        Ok(path)
    } else {
        error!("Path is not a directory {}", path.display());
        Err(std::io::Error::new(std::io::ErrorKind::NotADirectory, path.to_string_lossy().to_string()))
    }
}

pub fn make_absolute_path(path: &str, base: &str) -> PathBuf {
    let rp = PathBuf::from(path);
    if rp.is_relative() {
        let base_path = if base.is_empty() {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        } else {
            PathBuf::from(base)
        };
        base_path.join(rp).clean()
    } else {
        rp.clean()
    }
}

#[cfg(test)]
mod tests {
    use super::{make_absolute_path, prepare_directory};
    use std::path::PathBuf;

    #[test]
    fn test_absolute_path() {
        assert_eq!(make_absolute_path("data/../rec", "/srv/hub"), PathBuf::from("/srv/hub/rec"));
        assert_eq!(make_absolute_path("/var/lib/hub", "/srv/hub"), PathBuf::from("/var/lib/hub"));
    }

    #[test]
    fn test_prepare_directory() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_string_lossy().to_string();
        let created = prepare_directory(&base, "data/recordings").unwrap();
        assert!(created.is_dir());
    }
}
