use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base hostadmin config directory (~/.config/hostadmin/, %APPDATA%\hostadmin on Windows)
pub fn hostadmin() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("hostadmin"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("hostadmin"))
    }
}

/// Global hostadmin.json config file path
pub fn hostadmin_json() -> Result<PathBuf> {
    Ok(hostadmin()?.join("hostadmin.json"))
}
