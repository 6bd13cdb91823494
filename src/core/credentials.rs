//! Named credential profiles.
//!
//! The user name of a profile is stored in hostadmin.json; its secret is stored
//! in the system keychain (macOS Keychain, Windows Credential Manager) under the
//! `hostadmin` service, keyed by profile name.

use crate::defaults::{CredentialProfile, HostadminConfig};
use crate::error::{Error, ErrorCode, Result};
use crate::remote::{Credentials, Secret};
use crate::utils::validation;
use keyring::Entry;
use serde::Serialize;
use serde_json::Value;

const SERVICE_NAME: &str = "hostadmin";

fn keyring_error(e: keyring::Error) -> Error {
    Error::new(
        ErrorCode::InternalUnexpected,
        format!("Keychain error: {}", e),
        Value::Null,
    )
}

/// Source of profile secrets.
pub trait SecretStore {
    fn get(&self, name: &str) -> Result<Option<String>>;
    fn set(&self, name: &str, secret: &str) -> Result<()>;
    fn delete(&self, name: &str) -> Result<()>;
}

/// Secret store backed by the system keychain.
pub struct Keychain;

impl SecretStore for Keychain {
    fn get(&self, name: &str) -> Result<Option<String>> {
        let entry = Entry::new(SERVICE_NAME, name).map_err(keyring_error)?;

        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(keyring_error(e)),
        }
    }

    fn set(&self, name: &str, secret: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, name).map_err(keyring_error)?;
        entry.set_password(secret).map_err(keyring_error)
    }

    fn delete(&self, name: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, name).map_err(keyring_error)?;

        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(keyring_error(e)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSummary {
    pub name: String,
    pub user: String,
    pub has_secret: bool,
}

/// Resolve an optional credential reference into transport credentials.
///
/// No reference means the caller's ambient identity.
pub fn resolve(
    reference: Option<&str>,
    config: &HostadminConfig,
    store: &dyn SecretStore,
) -> Result<Credentials> {
    let Some(name) = reference else {
        return Ok(Credentials::ambient());
    };

    let name = validation::require_non_empty(name, "credential", "Credential name cannot be empty")?;
    let profile = config
        .credentials
        .get(name)
        .ok_or_else(|| Error::credential_not_found(name))?;
    let secret = store
        .get(name)?
        .ok_or_else(|| Error::credential_not_found(name))?;

    Ok(Credentials::supplied(profile.user.clone(), Secret::new(secret)))
}

/// Add or replace a profile. The caller persists `config`.
pub fn set(
    config: &mut HostadminConfig,
    store: &dyn SecretStore,
    name: &str,
    user: &str,
    secret: &str,
) -> Result<CredentialSummary> {
    let name = validation::require_non_empty(name, "name", "Credential name cannot be empty")?;
    let user = validation::require_non_empty(user, "user", "User cannot be empty")?;
    if secret.is_empty() {
        return Err(Error::validation_invalid_argument(
            "secret",
            "Secret cannot be empty",
            Some(name.to_string()),
        ));
    }

    store.set(name, secret)?;
    config.credentials.insert(
        name.to_string(),
        CredentialProfile {
            user: user.to_string(),
        },
    );

    Ok(CredentialSummary {
        name: name.to_string(),
        user: user.to_string(),
        has_secret: true,
    })
}

/// Remove a profile and its secret. The caller persists `config`.
pub fn remove(config: &mut HostadminConfig, store: &dyn SecretStore, name: &str) -> Result<()> {
    let name = validation::require_non_empty(name, "name", "Credential name cannot be empty")?;
    if config.credentials.remove(name).is_none() {
        return Err(Error::credential_not_found(name));
    }
    store.delete(name)
}

/// Keychain failures are returned rather than reported as a missing secret.
pub fn list(config: &HostadminConfig, store: &dyn SecretStore) -> Result<Vec<CredentialSummary>> {
    config
        .credentials
        .iter()
        .map(|(name, profile)| {
            Ok(CredentialSummary {
                name: name.clone(),
                user: profile.user.clone(),
                has_secret: store.get(name)?.is_some(),
            })
        })
        .collect()
}
