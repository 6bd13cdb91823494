//! Static DNS server changes on a remote host.
//!
//! The update runs as a linear sequence: validate, connect and identify,
//! operator confirmation, locate the interface, read the original list, apply
//! the new list, re-read it, and ask the host to re-register in DNS. Nothing is
//! changed on the host unless the operator answers exactly `Y` or `y`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::IpAddr;
use uuid::Uuid;

use crate::error::{Cause, Error, ErrorRecord, RemoteStep, Result};
use crate::identity::{self, HostIdentity, SystemMatch};
use crate::operator::{self, Operator};
use crate::remote::{
    self, Credentials, InterfaceRef, NetworkInterface, RemoteSession, RemoteSystemClient,
    SetDnsOutcome,
};
use crate::utils::validation;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceSummary {
    pub index: InterfaceRef,
    pub description: String,
}

impl From<&NetworkInterface> for InterfaceSummary {
    fn from(iface: &NetworkInterface) -> Self {
        Self {
            index: iface.index,
            description: iface.description.clone(),
        }
    }
}

/// Outcome of an applied change.
///
/// `confirmed_servers` is only populated after the new list was applied and
/// read back. `error` is set when a step after the change failed; the change
/// itself is not rolled back. `verified` is false when the read-back list
/// differs from the requested one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsChangeRecord {
    pub id: Uuid,
    pub target: HostIdentity,
    pub interface: InterfaceSummary,
    pub original_servers: Vec<IpAddr>,
    pub requested_servers: Vec<IpAddr>,
    pub confirmed_servers: Vec<IpAddr>,
    pub verified: bool,
    pub reboot_required: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

impl DnsChangeRecord {
    /// Applied, read back unchanged, and re-registered.
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.verified
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortedUpdate {
    pub target: HostIdentity,
    pub requested_servers: Vec<IpAddr>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DnsUpdateOutcome {
    Applied(DnsChangeRecord),
    Aborted(AbortedUpdate),
}

/// Current DNS configuration of a host's active interface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsSnapshot {
    pub target: HostIdentity,
    pub interface: InterfaceSummary,
    pub servers: Vec<IpAddr>,
}

pub const CONFIRM_PROMPT: &str = "Apply these DNS servers? [Y/N] ";

/// Change the DNS server list of the interface bound to the target's active address.
pub fn update_dns<C: RemoteSystemClient>(
    client: &C,
    operator: &mut dyn Operator,
    target: &str,
    servers: &[String],
    credentials: &Credentials,
) -> Result<DnsUpdateOutcome> {
    let target = validation::require_target(target)?;
    let requested = validation::parse_addresses(servers, "servers")?;
    let started_at = Utc::now();

    let session = client.connect(target, credentials)?;
    let host = identity::fetch_host_identity(&session)?;

    for line in describe_change(&host, &requested) {
        operator.show(&line);
    }
    let answer = operator.ask(CONFIRM_PROMPT)?;
    if !operator::is_affirmative(&answer) {
        log_status!("dns", "Aborted by operator, no changes made to {}", target);
        return Ok(DnsUpdateOutcome::Aborted(AbortedUpdate {
            target: host,
            requested_servers: requested,
        }));
    }

    let iface = locate_interface(&session, &host.resolved_address)?;
    let original = session.dns_servers(iface.index)?;

    let applied = session.set_dns_servers(iface.index, &requested)?;

    let mut record = DnsChangeRecord {
        id: Uuid::new_v4(),
        target: host,
        interface: InterfaceSummary::from(&iface),
        original_servers: original,
        requested_servers: requested,
        confirmed_servers: Vec::new(),
        verified: false,
        reboot_required: applied == SetDnsOutcome::AppliedRebootRequired,
        started_at,
        finished_at: started_at,
        error: None,
    };

    match session.dns_servers(iface.index) {
        Ok(confirmed) => {
            record.verified = confirmed == record.requested_servers;
            if !record.verified {
                log_status!(
                    "dns",
                    "Read-back list on {} differs from the requested list",
                    target
                );
            }
            record.confirmed_servers = confirmed;
        }
        Err(err) => {
            log_status!("dns", "DNS list applied but could not be read back: {}", err);
            record.error = Some(err.to_record());
            record.finished_at = Utc::now();
            return Ok(DnsUpdateOutcome::Applied(record));
        }
    }

    if let Err(err) = session.reregister_dns() {
        log_status!("dns", "DNS list applied but re-registration failed: {}", err);
        record.error = Some(err.to_record());
    }

    record.finished_at = Utc::now();
    Ok(DnsUpdateOutcome::Applied(record))
}

/// Read the DNS server list of the target's active interface without changing anything.
pub fn show_dns<C: RemoteSystemClient>(
    client: &C,
    target: &str,
    credentials: &Credentials,
) -> Result<DnsSnapshot> {
    let target = validation::require_target(target)?;

    let session = client.connect(target, credentials)?;
    let host = identity::fetch_host_identity(&session)?;
    let iface = locate_interface(&session, &host.resolved_address)?;
    let servers = session.dns_servers(iface.index)?;

    Ok(DnsSnapshot {
        target: host,
        interface: InterfaceSummary::from(&iface),
        servers,
    })
}

fn locate_interface<S: RemoteSession>(session: &S, address: &IpAddr) -> Result<NetworkInterface> {
    let interfaces = session.interfaces()?;

    remote::interface_for_address(&interfaces, address)
        .cloned()
        .ok_or_else(|| {
            Error::remote_query_failed(
                session.target(),
                RemoteStep::Interfaces,
                Cause::new(format!("No network interface is bound to {}", address), None),
            )
        })
}

/// Lines shown to the operator before the confirmation prompt.
pub fn describe_change(host: &HostIdentity, requested: &[IpAddr]) -> Vec<String> {
    let classification = match identity::classify_system(
        &host.requested_id,
        &host.resolved_name,
        &host.resolved_address,
    ) {
        SystemMatch::Confirmed => "name matches",
        SystemMatch::Unverified => "address only, name unverified",
        SystemMatch::Mismatched => "DOES NOT MATCH target",
    };

    vec![
        format!("Target:          {}", host.requested_id),
        format!("Host name:       {} ({})", host.resolved_name, classification),
        format!("Active address:  {}", host.resolved_address),
        format!(
            "Logged-on user:  {}",
            host.logged_on_user.as_deref().unwrap_or("(none)")
        ),
        format!("New DNS servers: {}", join_addresses(requested)),
    ]
}

fn join_addresses(addresses: &[IpAddr]) -> String {
    addresses
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
