//! Confirm that a target identifier really points at the intended host.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::error::{ErrorRecord, Result};
use crate::remote::{Credentials, RemoteSession, RemoteSystemClient};
use crate::utils::validation;

/// What a target identifier resolved to on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostIdentity {
    pub requested_id: String,
    pub resolved_name: String,
    pub resolved_address: IpAddr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logged_on_user: Option<String>,
}

/// Three-way host classification.
///
/// `Unverified` means only the numeric address matched, which any host
/// holding that address would satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemMatch {
    #[serde(rename = "true")]
    Confirmed,
    #[serde(rename = "false")]
    Mismatched,
    #[serde(rename = "unverified")]
    Unverified,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResult {
    pub system_matches: SystemMatch,
    /// `None` when no expected user was given.
    pub user_matches: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<HostIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

impl ConfirmationResult {
    /// True only when the host is confirmed and any expected user matched.
    pub fn is_confirmed(&self) -> bool {
        self.system_matches == SystemMatch::Confirmed && self.user_matches != Some(false)
    }
}

/// Read the resolved name, active address and logged-on user of a session's target.
pub fn fetch_host_identity<S: RemoteSession>(session: &S) -> Result<HostIdentity> {
    let system = session.identity()?;
    let address = session.active_address()?;

    Ok(HostIdentity {
        requested_id: session.target().to_string(),
        resolved_name: system.name,
        resolved_address: address,
        logged_on_user: system.primary_user,
    })
}

/// Host names compare case-insensitively; an address match alone is unverified.
pub fn classify_system(target: &str, resolved_name: &str, resolved_address: &IpAddr) -> SystemMatch {
    let target = target.trim();

    if target.eq_ignore_ascii_case(resolved_name.trim()) {
        return SystemMatch::Confirmed;
    }

    match target.parse::<IpAddr>() {
        Ok(address) if address == *resolved_address => SystemMatch::Unverified,
        _ => SystemMatch::Mismatched,
    }
}

/// A logged-on user matches when it equals the expected user or ends with
/// `\expected` (any domain), ignoring case.
pub fn user_matches(logged_on: Option<&str>, expected: &str) -> bool {
    let Some(logged_on) = logged_on else {
        return false;
    };
    let logged_on = logged_on.trim().to_lowercase();
    let expected = expected.trim().to_lowercase();

    if expected.is_empty() {
        return false;
    }

    logged_on == expected || logged_on.ends_with(&format!("\\{}", expected))
}

/// Classify a fetched identity against the caller's expectations.
pub fn evaluate(identity: HostIdentity, expected_user: Option<&str>) -> ConfirmationResult {
    let system_matches = classify_system(
        &identity.requested_id,
        &identity.resolved_name,
        &identity.resolved_address,
    );
    let user_result =
        expected_user.map(|expected| user_matches(identity.logged_on_user.as_deref(), expected));

    let failure_reason = match system_matches {
        SystemMatch::Mismatched => Some(format!(
            "Target '{}' resolved to host '{}' ({})",
            identity.requested_id, identity.resolved_name, identity.resolved_address
        )),
        SystemMatch::Unverified => Some(format!(
            "Only the address {} matched; host name '{}' could not be confirmed",
            identity.resolved_address, identity.resolved_name
        )),
        SystemMatch::Confirmed => None,
    }
    .or_else(|| match (user_result, expected_user) {
        (Some(false), Some(expected)) => Some(match &identity.logged_on_user {
            Some(user) => format!("Logged-on user '{}' is not '{}'", user, expected),
            None => format!("No user is logged on; expected '{}'", expected),
        }),
        _ => None,
    });

    ConfirmationResult {
        system_matches,
        user_matches: user_result,
        failure_reason,
        identity: Some(identity),
        error: None,
    }
}

/// Confirm a target's identity and, optionally, its logged-on user.
///
/// Only input validation returns `Err`. Remote failures are folded into the
/// result with the underlying error attached.
pub fn confirm<C: RemoteSystemClient>(
    client: &C,
    target: &str,
    expected_user: Option<&str>,
    credentials: &Credentials,
) -> Result<ConfirmationResult> {
    let target = validation::require_target(target)?;
    let expected_user = expected_user.map(str::trim).filter(|u| !u.is_empty());

    let fetched = client
        .connect(target, credentials)
        .and_then(|session| fetch_host_identity(&session));

    match fetched {
        Ok(identity) => {
            let result = evaluate(identity, expected_user);
            log_status!(
                "identity",
                "{} -> {:?}{}",
                target,
                result.system_matches,
                result
                    .failure_reason
                    .as_deref()
                    .map(|r| format!(" ({})", r))
                    .unwrap_or_default()
            );
            Ok(result)
        }
        Err(err) => Ok(ConfirmationResult {
            system_matches: SystemMatch::Mismatched,
            user_matches: expected_user.map(|_| false),
            failure_reason: Some(err.to_string()),
            identity: None,
            error: Some(err.to_record()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(value: &str) -> IpAddr {
        value.parse().unwrap()
    }

    fn identity(requested: &str, name: &str, address: &str, user: Option<&str>) -> HostIdentity {
        HostIdentity {
            requested_id: requested.to_string(),
            resolved_name: name.to_string(),
            resolved_address: addr(address),
            logged_on_user: user.map(str::to_string),
        }
    }

    #[test]
    fn name_match_is_confirmed() {
        assert_eq!(
            classify_system("WIN10", "WIN10", &addr("192.168.2.60")),
            SystemMatch::Confirmed
        );
        assert_eq!(
            classify_system("win10", "WIN10", &addr("192.168.2.60")),
            SystemMatch::Confirmed
        );
    }

    #[test]
    fn address_only_match_is_unverified() {
        assert_eq!(
            classify_system("192.168.2.60", "WIN10", &addr("192.168.2.60")),
            SystemMatch::Unverified
        );
    }

    #[test]
    fn anything_else_is_mismatched() {
        assert_eq!(
            classify_system("WIN10", "OTHER", &addr("192.168.2.60")),
            SystemMatch::Mismatched
        );
        assert_eq!(
            classify_system("192.168.2.61", "WIN10", &addr("192.168.2.60")),
            SystemMatch::Mismatched
        );
    }

    #[test]
    fn user_matches_exact_or_domain_suffix() {
        assert!(user_matches(Some("CORP\\jdoe"), "jdoe"));
        assert!(user_matches(Some("CORP\\jdoe"), "CORP\\jdoe"));
        assert!(user_matches(Some("corp\\JDoe"), "jdoe"));
        assert!(user_matches(Some("jdoe"), "jdoe"));
        assert!(!user_matches(Some("CORP\\xjdoe"), "jdoe"));
        assert!(!user_matches(Some("CORP\\jdoe"), "admin"));
        assert!(!user_matches(None, "jdoe"));
    }

    #[test]
    fn evaluate_without_expected_user_is_not_applicable() {
        let result = evaluate(identity("WIN10", "WIN10", "192.168.2.60", None), None);
        assert_eq!(result.system_matches, SystemMatch::Confirmed);
        assert_eq!(result.user_matches, None);
        assert!(result.failure_reason.is_none());
        assert!(result.is_confirmed());
    }

    #[test]
    fn evaluate_reports_user_mismatch() {
        let result = evaluate(
            identity("WIN10", "WIN10", "192.168.2.60", Some("CORP\\alice")),
            Some("bob"),
        );
        assert_eq!(result.user_matches, Some(false));
        assert!(!result.is_confirmed());
        assert!(result.failure_reason.unwrap().contains("alice"));
    }

    #[test]
    fn tri_state_serializes_as_text() {
        assert_eq!(serde_json::to_value(SystemMatch::Confirmed).unwrap(), "true");
        assert_eq!(serde_json::to_value(SystemMatch::Mismatched).unwrap(), "false");
        assert_eq!(serde_json::to_value(SystemMatch::Unverified).unwrap(), "unverified");
    }
}
