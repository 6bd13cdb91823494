//! Input validation primitives.
//!
//! Provides ergonomic helpers for common validation patterns:
//! - Validating non-empty strings and collections
//! - Checking host targets before they are embedded in remote scripts
//! - Parsing ordered address lists
//!
//! Every failure is a `validation.*` error raised before any remote call.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Require a string to be non-empty after trimming.
///
/// Returns a reference to the trimmed string on success.
pub fn require_non_empty<'a>(value: &'a str, field: &str, message: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation_invalid_argument(field, message, None))
    } else {
        Ok(trimmed)
    }
}

/// Require a collection to be non-empty.
pub fn require_non_empty_vec<'a, T>(vec: &'a [T], field: &str, message: &str) -> Result<&'a [T]> {
    if vec.is_empty() {
        Err(Error::validation_invalid_argument(field, message, None))
    } else {
        Ok(vec)
    }
}

// Dot-separated labels of letters, digits, '-' and '_', optional trailing dot
static HOST_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_-]{0,62}(\.[A-Za-z0-9_][A-Za-z0-9_-]{0,62})*\.?$").unwrap()
});

/// Require a target to be a host name or an IP literal.
///
/// Returns the trimmed target.
pub fn require_target(value: &str) -> Result<&str> {
    let target = require_non_empty(value, "target", "Target host cannot be empty")?;

    if target.parse::<IpAddr>().is_ok() || HOST_NAME_PATTERN.is_match(target) {
        return Ok(target);
    }

    Err(Error::validation_invalid_argument(
        "target",
        "Target must be a host name or an IP address",
        Some(target.to_string()),
    ))
}

/// Parse an ordered list of IP addresses.
///
/// Entries are trimmed; the list must be non-empty, every entry must parse and
/// no address may repeat.
pub fn parse_addresses(values: &[String], field: &str) -> Result<Vec<IpAddr>> {
    require_non_empty_vec(values, field, "At least one address is required")?;

    let mut seen = HashSet::new();
    let mut addresses = Vec::with_capacity(values.len());

    for raw in values {
        let value = raw.trim();
        let address: IpAddr = value.parse().map_err(|_| {
            Error::validation_invalid_argument(
                field,
                format!("'{}' is not a valid IP address", value),
                Some(value.to_string()),
            )
        })?;

        if !seen.insert(address) {
            return Err(Error::validation_invalid_argument(
                field,
                format!("Address {} is listed more than once", address),
                Some(value.to_string()),
            ));
        }

        addresses.push(address);
    }

    Ok(addresses)
}
