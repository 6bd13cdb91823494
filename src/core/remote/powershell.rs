use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::net::IpAddr;
use std::process::{Command, Stdio};

use super::{
    Credentials, InterfaceRef, NetworkInterface, RemoteSession, RemoteSystemClient, SetDnsOutcome,
    SystemIdentity,
};
use crate::defaults::PowerShellConfig;
use crate::error::{Cause, Error, RemoteStep, Result};
use crate::utils::shell;

/// Child-process environment variable carrying a supplied secret.
const SECRET_ENV: &str = "HOSTADMIN_CIM_SECRET";

/// Remote management over CIM, driven through a local PowerShell process.
pub struct PowerShellClient {
    pub executable: String,
    pub args: Vec<String>,
}

pub struct PowerShellSession {
    target: String,
    credentials: Credentials,
    executable: String,
    args: Vec<String>,
    /// When true, the CIM session is opened without `-ComputerName`.
    /// Set automatically when the target is localhost/127.0.0.1/::1.
    is_local: bool,
}

struct CommandOutput {
    stdout: String,
    stderr: String,
    success: bool,
    exit_code: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptReply {
    ok: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityReply {
    name: String,
    #[serde(default)]
    user_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InterfaceReply {
    index: u32,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    addresses: Vec<String>,
    #[serde(default)]
    dns_servers: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReturnValueReply {
    return_value: i64,
}

impl PowerShellClient {
    pub fn from_config(config: &PowerShellConfig) -> Self {
        Self {
            executable: config.resolved_executable(),
            args: config.args.clone(),
        }
    }
}

impl RemoteSystemClient for PowerShellClient {
    type Session = PowerShellSession;

    fn connect(&self, target: &str, credentials: &Credentials) -> Result<PowerShellSession> {
        let is_local = is_local_host(target);
        if is_local {
            log_status!("remote", "Target '{}' is localhost, using a local CIM session", target);
        }

        let session = PowerShellSession {
            target: target.to_string(),
            credentials: credentials.clone(),
            executable: self.executable.clone(),
            args: self.args.clone(),
            is_local,
        };

        log_status!("remote", "Opening CIM session to {}", target);
        session
            .run(PROBE_BODY)
            .map_err(|cause| Error::remote_connect_failed(target, cause))?;

        Ok(session)
    }
}

const PROBE_BODY: &str =
    "$result = (Get-CimInstance -CimSession $cim -ClassName Win32_OperatingSystem).CSName";

const IDENTITY_BODY: &str = "$cs = Get-CimInstance -CimSession $cim -ClassName Win32_ComputerSystem
$result = [pscustomobject]@{ name = $cs.Name; userName = $cs.UserName }";

const INTERFACES_BODY: &str = "$result = @(Get-CimInstance -CimSession $cim -ClassName Win32_NetworkAdapterConfiguration -Filter 'IPEnabled = TRUE' | ForEach-Object {
    [pscustomobject]@{
        index = [int]$_.Index
        description = $_.Description
        addresses = @($_.IPAddress | Where-Object { $_ })
        dnsServers = @($_.DNSServerSearchOrder | Where-Object { $_ })
    }
})";

const REREGISTER_BODY: &str = "$r = Invoke-CimMethod -CimSession $cim -ClassName Win32_Process -MethodName Create -Arguments @{ CommandLine = 'ipconfig.exe /registerdns' }
$result = [pscustomobject]@{ returnValue = [int]$r.ReturnValue }";

impl PowerShellSession {
    fn query<T: DeserializeOwned>(&self, step: RemoteStep, body: &str) -> Result<T> {
        self.run(body)
            .and_then(decode::<T>)
            .map_err(|cause| Error::remote_query_failed(&self.target, step, cause))
    }

    fn mutate<T: DeserializeOwned>(&self, step: RemoteStep, body: &str) -> Result<T> {
        self.run(body)
            .and_then(decode::<T>)
            .map_err(|cause| Error::remote_mutation_failed(&self.target, step, cause))
    }

    fn run(&self, body: &str) -> std::result::Result<Value, Cause> {
        let script = build_script(&self.target, self.is_local, &self.credentials, body);
        let output = self.execute_once(&script);
        parse_reply(&output)
    }

    fn execute_once(&self, script: &str) -> CommandOutput {
        let mut cmd = Command::new(&self.executable);
        cmd.args(&self.args);
        cmd.arg("-EncodedCommand")
            .arg(shell::encode_powershell_command(script));
        cmd.stdin(Stdio::null());

        if let Credentials::Supplied { secret, .. } = &self.credentials {
            cmd.env(SECRET_ENV, secret.expose());
        }

        match cmd.output() {
            Ok(out) => CommandOutput {
                stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                success: out.status.success(),
                exit_code: out.status.code().unwrap_or(-1),
            },
            Err(e) => CommandOutput {
                stdout: String::new(),
                stderr: format!("Failed to start {}: {}", self.executable, e),
                success: false,
                exit_code: -1,
            },
        }
    }
}

impl RemoteSession for PowerShellSession {
    fn target(&self) -> &str {
        &self.target
    }

    fn identity(&self) -> Result<SystemIdentity> {
        let reply: IdentityReply = self.query(RemoteStep::Identity, IDENTITY_BODY)?;

        Ok(SystemIdentity {
            name: reply.name,
            primary_user: reply.user_name.filter(|u| !u.trim().is_empty()),
        })
    }

    fn active_address(&self) -> Result<IpAddr> {
        let body = active_address_body(&self.target);
        let raw: String = self.query(RemoteStep::ActiveAddress, &body)?;

        parse_address(&raw).ok_or_else(|| {
            Error::remote_query_failed(
                &self.target,
                RemoteStep::ActiveAddress,
                Cause::new(format!("'{}' is not an IP address", raw), None),
            )
        })
    }

    fn interfaces(&self) -> Result<Vec<NetworkInterface>> {
        let replies: Vec<InterfaceReply> = self.query(RemoteStep::Interfaces, INTERFACES_BODY)?;

        Ok(replies
            .into_iter()
            .map(|reply| NetworkInterface {
                index: InterfaceRef(reply.index),
                description: reply.description.unwrap_or_default(),
                addresses: reply.addresses.iter().filter_map(|a| parse_address(a)).collect(),
                dns_servers: reply
                    .dns_servers
                    .iter()
                    .filter_map(|a| parse_address(a))
                    .collect(),
            })
            .collect())
    }

    fn dns_servers(&self, interface: InterfaceRef) -> Result<Vec<IpAddr>> {
        let body = format!(
            "{}\n$result = @($nic.DNSServerSearchOrder | Where-Object {{ $_ }})",
            adapter_lookup(interface)
        );
        let raw: Vec<String> = self.query(RemoteStep::DnsServers, &body)?;

        raw.iter()
            .map(|value| {
                parse_address(value).ok_or_else(|| {
                    Error::remote_query_failed(
                        &self.target,
                        RemoteStep::DnsServers,
                        Cause::new(format!("'{}' is not an IP address", value), None),
                    )
                })
            })
            .collect()
    }

    fn set_dns_servers(&self, interface: InterfaceRef, servers: &[IpAddr]) -> Result<SetDnsOutcome> {
        let rendered: Vec<String> = servers.iter().map(|s| s.to_string()).collect();
        let body = format!(
            "{}\n$r = Invoke-CimMethod -CimSession $cim -InputObject $nic -MethodName SetDNSServerSearchOrder -Arguments @{{ DNSServerSearchOrder = [string[]]{} }}\n$result = [pscustomobject]@{{ returnValue = [int]$r.ReturnValue }}",
            adapter_lookup(interface),
            shell::quote_array(&rendered)
        );

        log_status!(
            "remote",
            "Setting DNS servers on {} interface {} to {}",
            self.target,
            interface,
            rendered.join(", ")
        );
        let reply: ReturnValueReply = self.mutate(RemoteStep::SetDnsServers, &body)?;

        match reply.return_value {
            0 => Ok(SetDnsOutcome::Applied),
            1 => Ok(SetDnsOutcome::AppliedRebootRequired),
            code => Err(Error::remote_mutation_failed(
                &self.target,
                RemoteStep::SetDnsServers,
                Cause::new(
                    format!(
                        "SetDNSServerSearchOrder returned {}: {}",
                        code,
                        adapter_config_return_meaning(code)
                    ),
                    Some("Win32_NetworkAdapterConfiguration.ReturnValue".to_string()),
                ),
            )),
        }
    }

    fn reregister_dns(&self) -> Result<()> {
        log_status!("remote", "Requesting DNS re-registration on {}", self.target);
        let reply: ReturnValueReply = self.mutate(RemoteStep::ReregisterDns, REREGISTER_BODY)?;

        if reply.return_value == 0 {
            return Ok(());
        }

        Err(Error::remote_mutation_failed(
            &self.target,
            RemoteStep::ReregisterDns,
            Cause::new(
                format!(
                    "Win32_Process.Create returned {}: {}",
                    reply.return_value,
                    process_create_return_meaning(reply.return_value)
                ),
                Some("Win32_Process.ReturnValue".to_string()),
            ),
        ))
    }
}

/// Wrap a step body in session setup and a single-line JSON reply.
///
/// The body runs with `$cim` bound to an open CIM session and must assign `$result`.
fn build_script(target: &str, is_local: bool, credentials: &Credentials, body: &str) -> String {
    let mut setup = String::from("    $sessionArgs = @{}\n");

    if !is_local {
        setup.push_str(&format!(
            "    $sessionArgs['ComputerName'] = {}\n",
            shell::quote_literal(target)
        ));
    }

    if let Some(user) = credentials.user() {
        setup.push_str(&format!(
            "    $secure = ConvertTo-SecureString $env:{} -AsPlainText -Force\n    $sessionArgs['Credential'] = New-Object System.Management.Automation.PSCredential({}, $secure)\n",
            SECRET_ENV,
            shell::quote_literal(user)
        ));
    }

    let indented_body: String = body
        .lines()
        .map(|line| format!("        {}\n", line))
        .collect();

    format!(
        "$ErrorActionPreference = 'Stop'
$ProgressPreference = 'SilentlyContinue'
try {{
{setup}    $cim = New-CimSession @sessionArgs
    try {{
{indented_body}    }} finally {{
        Remove-CimSession -CimSession $cim -ErrorAction SilentlyContinue
    }}
    [pscustomobject]@{{ ok = $true; data = $result }} | ConvertTo-Json -Compress -Depth 5
}} catch {{
    [pscustomobject]@{{ ok = $false; error = $_.Exception.Message; errorName = $_.Exception.GetType().FullName }} | ConvertTo-Json -Compress
}}
"
    )
}

fn adapter_lookup(interface: InterfaceRef) -> String {
    format!(
        "$nic = Get-CimInstance -CimSession $cim -ClassName Win32_NetworkAdapterConfiguration -Filter 'Index = {0}'\nif (-not $nic) {{ throw 'No network adapter with index {0}' }}",
        interface.0
    )
}

/// A literal IP target bound to the host is its own active address; otherwise
/// the first IPv4 address of the adapter carrying the default gateway.
fn active_address_body(target: &str) -> String {
    format!(
        "$configs = @(Get-CimInstance -CimSession $cim -ClassName Win32_NetworkAdapterConfiguration -Filter 'IPEnabled = TRUE')
$requested = {}
$bound = $configs | Where-Object {{ $_.IPAddress -contains $requested }} | Select-Object -First 1
if ($bound) {{
    $result = $requested
}} else {{
    $active = $configs | Where-Object {{ $_.DefaultIPGateway }} | Select-Object -First 1
    if (-not $active) {{ $active = $configs | Select-Object -First 1 }}
    if (-not $active) {{ throw 'No IP-enabled network adapter found' }}
    $v4 = @($active.IPAddress | Where-Object {{ $_ -match '^\\d+\\.\\d+\\.\\d+\\.\\d+$' }})
    if ($v4.Count -gt 0) {{ $result = $v4[0] }} else {{ $result = @($active.IPAddress)[0] }}
}}",
        shell::quote_literal(target)
    )
}

fn parse_reply(output: &CommandOutput) -> std::result::Result<Value, Cause> {
    let reply_line = output
        .stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('{'));

    let Some(line) = reply_line else {
        let detail = if output.stderr.trim().is_empty() {
            format!("PowerShell exited with code {} and no reply", output.exit_code)
        } else {
            output.stderr.trim().to_string()
        };
        let name = if output.success {
            "InvalidReply"
        } else {
            "ProcessError"
        };
        return Err(Cause::new(detail, Some(name.to_string())));
    };

    let reply: ScriptReply = serde_json::from_str(line)
        .map_err(|e| Cause::new(format!("Unreadable reply: {}", e), Some("InvalidReply".to_string())))?;

    if reply.ok {
        Ok(reply.data)
    } else {
        Err(Cause::new(
            reply.error.unwrap_or_else(|| "Unknown remote error".to_string()),
            reply.error_name,
        ))
    }
}

fn decode<T: DeserializeOwned>(data: Value) -> std::result::Result<T, Cause> {
    serde_json::from_value(data).map_err(|e| {
        Cause::new(
            format!("Unexpected reply shape: {}", e),
            Some("InvalidReply".to_string()),
        )
    })
}

fn parse_address(value: &str) -> Option<IpAddr> {
    value.trim().parse().ok()
}

/// Check if a target refers to the local machine.
pub fn is_local_host(host: &str) -> bool {
    matches!(
        host.to_ascii_lowercase().as_str(),
        "localhost" | "127.0.0.1" | "::1" | "."
    )
}

/// Documented meanings of Win32_NetworkAdapterConfiguration method return values.
fn adapter_config_return_meaning(code: i64) -> &'static str {
    match code {
        64 => "method not supported on this platform",
        65 => "unknown failure",
        66 => "invalid subnet mask",
        67 => "an error occurred while processing an instance that was returned",
        68 => "invalid input parameter",
        70 => "invalid IP address",
        72 => "error accessing the registry",
        80 => "unable to configure TCP/IP service",
        84 => "IP not enabled on adapter",
        91 => "access denied",
        92 => "out of memory",
        94 => "path, file or object not found",
        95 => "unable to notify service",
        96 => "unable to notify DNS service",
        97 => "interface not configurable",
        _ => "unrecognized return value",
    }
}

fn process_create_return_meaning(code: i64) -> &'static str {
    match code {
        2 => "access denied",
        3 => "insufficient privilege",
        8 => "unknown failure",
        9 => "path not found",
        21 => "invalid parameter",
        _ => "unrecognized return value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Secret;

    fn output(stdout: &str, stderr: &str, success: bool) -> CommandOutput {
        CommandOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            success,
            exit_code: if success { 0 } else { 1 },
        }
    }

    #[test]
    fn script_targets_remote_computer_and_quotes_it() {
        let script = build_script("WIN10", false, &Credentials::ambient(), PROBE_BODY);
        assert!(script.contains("$sessionArgs['ComputerName'] = 'WIN10'"));
        assert!(!script.contains("Credential"));
        assert!(script.contains("Win32_OperatingSystem"));
    }

    #[test]
    fn local_script_omits_computer_name() {
        let script = build_script("localhost", true, &Credentials::ambient(), PROBE_BODY);
        assert!(!script.contains("ComputerName"));
    }

    #[test]
    fn supplied_secret_never_appears_in_script() {
        let creds = Credentials::supplied("CORP\\o'neil", Secret::new("hunter2"));
        let script = build_script("WIN10", false, &creds, PROBE_BODY);
        assert!(!script.contains("hunter2"));
        assert!(script.contains("$env:HOSTADMIN_CIM_SECRET"));
        assert!(script.contains("PSCredential('CORP\\o''neil', $secure)"));
    }

    #[test]
    fn set_body_renders_address_array() {
        let rendered = shell::quote_array(&["192.168.1.1", "8.8.8.8"]);
        assert_eq!(rendered, "@('192.168.1.1','8.8.8.8')");
        assert!(adapter_lookup(InterfaceRef(7)).contains("'Index = 7'"));
    }

    #[test]
    fn parse_reply_takes_last_json_line() {
        let out = output("WARNING: noise\n{\"ok\":true,\"data\":\"WIN10\"}\n", "", true);
        assert_eq!(parse_reply(&out).unwrap(), Value::String("WIN10".to_string()));
    }

    #[test]
    fn parse_reply_surfaces_remote_error_and_name() {
        let out = output(
            "{\"ok\":false,\"error\":\"The WinRM client cannot process the request.\",\"errorName\":\"Microsoft.Management.Infrastructure.CimException\"}",
            "",
            true,
        );
        let cause = parse_reply(&out).unwrap_err();
        assert_eq!(cause.message, "The WinRM client cannot process the request.");
        assert_eq!(
            cause.name.as_deref(),
            Some("Microsoft.Management.Infrastructure.CimException")
        );
    }

    #[test]
    fn parse_reply_without_json_reports_process_error() {
        let out = output("", "pwsh: command not found", false);
        let cause = parse_reply(&out).unwrap_err();
        assert_eq!(cause.message, "pwsh: command not found");
        assert_eq!(cause.name.as_deref(), Some("ProcessError"));
    }

    #[test]
    fn missing_executable_is_connection_error() {
        let client = PowerShellClient {
            executable: "hostadmin-test-no-such-powershell".to_string(),
            args: Vec::new(),
        };
        let err = client
            .connect("WIN10", &Credentials::ambient())
            .err()
            .expect("connect should fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::Connection);
    }

    #[test]
    fn localhost_aliases_are_local() {
        assert!(is_local_host("localhost"));
        assert!(is_local_host("LOCALHOST"));
        assert!(is_local_host("::1"));
        assert!(!is_local_host("WIN10"));
    }

    #[test]
    fn return_codes_have_meanings() {
        assert_eq!(adapter_config_return_meaning(91), "access denied");
        assert_eq!(process_create_return_meaning(2), "access denied");
        assert_eq!(adapter_config_return_meaning(12345), "unrecognized return value");
    }
}
