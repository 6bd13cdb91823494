//! Remote management boundary.
//!
//! A [`RemoteSystemClient`] opens a [`RemoteSession`] to one target host. The
//! session exposes the handful of queries and changes the DNS and identity
//! workflows need. Every failure is attributed to a [`RemoteStep`](crate::error::RemoteStep)
//! and classified as a connection, query or mutation error.

mod powershell;

pub use powershell::{PowerShellClient, PowerShellSession};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use crate::error::Result;

/// Opaque secret passed through to the transport unmodified.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Identity a session is opened with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// The caller's own identity.
    Ambient,
    /// An alternate account.
    Supplied { user: String, secret: Secret },
}

impl Credentials {
    pub fn ambient() -> Self {
        Credentials::Ambient
    }

    pub fn supplied(user: impl Into<String>, secret: Secret) -> Self {
        Credentials::Supplied {
            user: user.into(),
            secret,
        }
    }

    pub fn user(&self) -> Option<&str> {
        match self {
            Credentials::Ambient => None,
            Credentials::Supplied { user, .. } => Some(user),
        }
    }
}

/// Host name and interactive user reported by the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemIdentity {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_user: Option<String>,
}

/// Index of a network adapter configuration on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceRef(pub u32);

impl fmt::Display for InterfaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub index: InterfaceRef,
    pub description: String,
    pub addresses: Vec<IpAddr>,
    pub dns_servers: Vec<IpAddr>,
}

impl NetworkInterface {
    pub fn is_bound_to(&self, address: &IpAddr) -> bool {
        self.addresses.contains(address)
    }
}

/// Outcome of a DNS server list change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetDnsOutcome {
    Applied,
    AppliedRebootRequired,
}

pub trait RemoteSystemClient {
    type Session: RemoteSession;

    /// Open a session; fails with a connection error.
    fn connect(&self, target: &str, credentials: &Credentials) -> Result<Self::Session>;
}

pub trait RemoteSession {
    fn target(&self) -> &str;

    fn identity(&self) -> Result<SystemIdentity>;

    fn active_address(&self) -> Result<IpAddr>;

    fn interfaces(&self) -> Result<Vec<NetworkInterface>>;

    fn dns_servers(&self, interface: InterfaceRef) -> Result<Vec<IpAddr>>;

    fn set_dns_servers(&self, interface: InterfaceRef, servers: &[IpAddr]) -> Result<SetDnsOutcome>;

    fn reregister_dns(&self) -> Result<()>;
}

/// Find the interface an address is bound to.
pub fn interface_for_address<'a>(
    interfaces: &'a [NetworkInterface],
    address: &IpAddr,
) -> Option<&'a NetworkInterface> {
    interfaces.iter().find(|iface| iface.is_bound_to(address))
}
