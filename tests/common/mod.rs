#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::rc::Rc;

use hostadmin::error::{Cause, RemoteStep};
use hostadmin::operator::Operator;
use hostadmin::remote::{
    Credentials, InterfaceRef, NetworkInterface, RemoteSession, RemoteSystemClient,
    SetDnsOutcome, SystemIdentity,
};
use hostadmin::{Error, Result};

pub fn addr(value: &str) -> IpAddr {
    value.parse().unwrap()
}

pub fn addrs(values: &[&str]) -> Vec<IpAddr> {
    values.iter().map(|v| addr(v)).collect()
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Simulated Windows host. Every remote call is appended to `calls`.
pub struct FakeHost {
    pub name: String,
    pub user: Option<String>,
    pub address: IpAddr,
    pub interface: NetworkInterface,
    pub calls: Vec<&'static str>,
    pub fail_on: Vec<&'static str>,
    pub reboot_required: bool,
    /// List the host keeps instead of the one it was asked to apply.
    pub applied_override: Option<Vec<IpAddr>>,
}

impl FakeHost {
    pub fn failing(mut self, step: &'static str) -> Self {
        self.fail_on.push(step);
        self
    }

    pub fn servers(&self) -> Vec<IpAddr> {
        self.interface.dns_servers.clone()
    }

    fn fails(&self, step: &str) -> bool {
        self.fail_on.iter().any(|s| *s == step)
    }
}

pub fn windows_host(name: &str, address: &str, servers: &[&str]) -> FakeHost {
    FakeHost {
        name: name.to_string(),
        user: Some("CORP\\jdoe".to_string()),
        address: addr(address),
        interface: NetworkInterface {
            index: InterfaceRef(7),
            description: "Intel(R) Ethernet Connection".to_string(),
            addresses: vec![addr(address), addr("fe80::1")],
            dns_servers: addrs(servers),
        },
        calls: Vec::new(),
        fail_on: Vec::new(),
        reboot_required: false,
        applied_override: None,
    }
}

#[derive(Clone)]
pub struct FakeClient {
    pub host: Rc<RefCell<FakeHost>>,
}

impl FakeClient {
    pub fn new(host: FakeHost) -> Self {
        Self {
            host: Rc::new(RefCell::new(host)),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.host.borrow().calls.clone()
    }

    pub fn called(&self, step: &str) -> bool {
        self.host.borrow().calls.iter().any(|c| *c == step)
    }
}

pub struct FakeSession {
    target: String,
    host: Rc<RefCell<FakeHost>>,
}

impl FakeSession {
    fn record(&self, step: &'static str) {
        self.host.borrow_mut().calls.push(step);
    }

    fn query_error(&self, step: RemoteStep) -> Error {
        Error::remote_query_failed(&self.target, step, Cause::new("simulated failure", None))
    }
}

impl RemoteSystemClient for FakeClient {
    type Session = FakeSession;

    fn connect(&self, target: &str, _credentials: &Credentials) -> Result<FakeSession> {
        self.host.borrow_mut().calls.push("connect");
        if self.host.borrow().fails("connect") {
            return Err(Error::remote_connect_failed(
                target,
                Cause::new("The RPC server is unavailable.", Some("CimException".to_string())),
            ));
        }

        Ok(FakeSession {
            target: target.to_string(),
            host: Rc::clone(&self.host),
        })
    }
}

impl RemoteSession for FakeSession {
    fn target(&self) -> &str {
        &self.target
    }

    fn identity(&self) -> Result<SystemIdentity> {
        self.record("identity");
        let host = self.host.borrow();
        if host.fails("identity") {
            return Err(self.query_error(RemoteStep::Identity));
        }
        Ok(SystemIdentity {
            name: host.name.clone(),
            primary_user: host.user.clone(),
        })
    }

    fn active_address(&self) -> Result<IpAddr> {
        self.record("active_address");
        let host = self.host.borrow();
        if host.fails("active_address") {
            return Err(self.query_error(RemoteStep::ActiveAddress));
        }
        Ok(host.address)
    }

    fn interfaces(&self) -> Result<Vec<NetworkInterface>> {
        self.record("interfaces");
        Ok(vec![self.host.borrow().interface.clone()])
    }

    fn dns_servers(&self, interface: InterfaceRef) -> Result<Vec<IpAddr>> {
        let reread = self.host.borrow().calls.contains(&"set_dns_servers");
        self.record("dns_servers");
        let host = self.host.borrow();
        if (reread && host.fails("reread")) || interface != host.interface.index {
            return Err(self.query_error(RemoteStep::DnsServers));
        }
        Ok(host.interface.dns_servers.clone())
    }

    fn set_dns_servers(&self, interface: InterfaceRef, servers: &[IpAddr]) -> Result<SetDnsOutcome> {
        self.record("set_dns_servers");
        let mut host = self.host.borrow_mut();
        if host.fails("set_dns_servers") || interface != host.interface.index {
            return Err(Error::remote_mutation_failed(
                &self.target,
                RemoteStep::SetDnsServers,
                Cause::new("SetDNSServerSearchOrder returned 70", None),
            ));
        }
        let applied = host
            .applied_override
            .clone()
            .unwrap_or_else(|| servers.to_vec());
        host.interface.dns_servers = applied;
        Ok(if host.reboot_required {
            SetDnsOutcome::AppliedRebootRequired
        } else {
            SetDnsOutcome::Applied
        })
    }

    fn reregister_dns(&self) -> Result<()> {
        self.record("reregister_dns");
        if self.host.borrow().fails("reregister_dns") {
            return Err(Error::remote_mutation_failed(
                &self.target,
                RemoteStep::ReregisterDns,
                Cause::new("Access is denied.", Some("UnauthorizedAccessException".to_string())),
            ));
        }
        Ok(())
    }
}

/// Operator that answers prompts from a script and records what it was shown.
#[derive(Default)]
pub struct ScriptedOperator {
    pub answers: VecDeque<String>,
    pub shown: Vec<String>,
    pub asked: Vec<String>,
}

impl ScriptedOperator {
    pub fn answering(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl Operator for ScriptedOperator {
    fn ask(&mut self, message: &str) -> Result<String> {
        self.asked.push(message.to_string());
        Ok(self.answers.pop_front().unwrap_or_default())
    }

    fn show(&mut self, message: &str) {
        self.shown.push(message.to_string());
    }
}
