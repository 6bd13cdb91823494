use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// Root configuration structure for hostadmin.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HostadminConfig {
    #[serde(default)]
    pub defaults: Defaults,

    /// Named credential profiles. Secrets live in the system keychain.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub credentials: BTreeMap<String, CredentialProfile>,
}

/// All configurable defaults that can be overridden via hostadmin.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_powershell")]
    pub powershell: PowerShellConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            powershell: default_powershell(),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// Configuration for the PowerShell CIM transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerShellConfig {
    #[serde(default = "default_powershell_executable")]
    pub executable: String,

    #[serde(default = "default_powershell_args")]
    pub args: Vec<String>,
}

/// Configuration for pipeline stage evaluation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Shell used to evaluate stages; platform shell when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialProfile {
    pub user: String,
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_powershell() -> PowerShellConfig {
    PowerShellConfig {
        executable: default_powershell_executable(),
        args: default_powershell_args(),
    }
}

fn default_powershell_executable() -> String {
    if cfg!(windows) {
        "powershell.exe".to_string()
    } else {
        "pwsh".to_string()
    }
}

fn default_powershell_args() -> Vec<String> {
    vec!["-NoProfile".to_string(), "-NonInteractive".to_string()]
}

impl PowerShellConfig {
    /// Executable path with `~` and environment variables expanded.
    pub fn resolved_executable(&self) -> String {
        shellexpand::full(&self.executable)
            .map(|expanded| expanded.to_string())
            .unwrap_or_else(|_| self.executable.clone())
    }
}

// =============================================================================
// Loading functions
// =============================================================================

/// Resolve the config file path, preferring an explicit override.
pub fn config_file(override_path: Option<&Path>) -> crate::Result<PathBuf> {
    match override_path {
        Some(path) => Ok(PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())),
        None => paths::hostadmin_json(),
    }
}

/// Load the config, returning built-in defaults when the file does not exist.
/// An unreadable or invalid file is an error.
pub fn load_config(override_path: Option<&Path>) -> crate::Result<HostadminConfig> {
    let path = config_file(override_path)?;

    if !path.exists() {
        return Ok(HostadminConfig::default());
    }

    let content = fs::read_to_string(&path).map_err(|e| {
        crate::Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    serde_json::from_str(&content)
        .map_err(|e| crate::Error::config_invalid_json(path.display().to_string(), e))
}

/// Save config to hostadmin.json (creates if missing).
pub fn save_config(config: &HostadminConfig, override_path: Option<&Path>) -> crate::Result<()> {
    let path = config_file(override_path)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            crate::Error::internal_io(e.to_string(), Some(format!("create {}", parent.display())))
        })?;
    }

    let content = serde_json::to_string_pretty(config).map_err(|e| {
        crate::Error::internal_json(e.to_string(), Some("serialize hostadmin.json".to_string()))
    })?;

    fs::write(&path, content).map_err(|e| {
        crate::Error::internal_io(e.to_string(), Some(format!("write {}", path.display())))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;

    #[test]
    fn missing_file_yields_builtin_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostadmin.json");

        let config = load_config(Some(&path)).unwrap();
        assert!(config.credentials.is_empty());
        assert_eq!(
            config.defaults.powershell.args,
            vec!["-NoProfile", "-NonInteractive"]
        );
        assert!(config.defaults.pipeline.shell.is_none());
    }

    #[test]
    fn partial_file_merges_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostadmin.json");
        fs::write(
            &path,
            r#"{"defaults":{"pipeline":{"shell":"/bin/bash"}},"credentials":{"lab":{"user":"CORP\\admin"}}}"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.defaults.pipeline.shell.as_deref(), Some("/bin/bash"));
        assert_eq!(config.defaults.powershell.executable, default_powershell_executable());
        assert_eq!(config.credentials["lab"].user, "CORP\\admin");
    }

    #[test]
    fn invalid_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostadmin.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidJson);
    }

    #[test]
    fn save_then_load_preserves_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("hostadmin.json");

        let mut config = HostadminConfig::default();
        config.credentials.insert(
            "lab".to_string(),
            CredentialProfile {
                user: "admin".to_string(),
            },
        );
        save_config(&config, Some(&path)).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.credentials, config.credentials);
    }
}
