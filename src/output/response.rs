//! CLI response formatting and output.
//!
//! Provides JSON envelope, printing, and exit code mapping.

use hostadmin::error::ErrorRecord;
use hostadmin::{Error, ErrorCode, Result};
use serde::Serialize;

/// Exit code for a command that returned a record carrying an error.
pub const EXIT_RECORDED_FAILURE: i32 = 20;

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_record()),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(()); // Exit gracefully on SIGPIPE
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

pub fn print_success<T: Serialize>(data: T) -> Result<()> {
    print_response(&CliResponse::success(data))
}

pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    match result {
        Ok(data) => print_success(data),
        Err(err) => print_response(&CliResponse::<()>::from_error(&err)),
    }
}

pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                )),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

pub fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigInvalidJson | ErrorCode::ValidationInvalidArgument => 2,

        ErrorCode::CredentialNotFound => 4,

        ErrorCode::RemoteConnectFailed => 10,

        ErrorCode::RemoteQueryFailed
        | ErrorCode::RemoteMutationFailed
        | ErrorCode::PipelineStageFailed => EXIT_RECORDED_FAILURE,

        ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostadmin::error::{Cause, RemoteStep};

    #[test]
    fn exit_codes_follow_error_family() {
        assert_eq!(exit_code_for_error(ErrorCode::ValidationInvalidArgument), 2);
        assert_eq!(exit_code_for_error(ErrorCode::ConfigInvalidJson), 2);
        assert_eq!(exit_code_for_error(ErrorCode::CredentialNotFound), 4);
        assert_eq!(exit_code_for_error(ErrorCode::RemoteConnectFailed), 10);
        assert_eq!(exit_code_for_error(ErrorCode::RemoteMutationFailed), 20);
        assert_eq!(exit_code_for_error(ErrorCode::PipelineStageFailed), 20);
        assert_eq!(exit_code_for_error(ErrorCode::InternalUnexpected), 1);
    }

    #[test]
    fn failed_command_maps_to_error_envelope() {
        let err = Error::remote_query_failed(
            "WIN10",
            RemoteStep::DnsServers,
            Cause::new("RPC server unavailable", None),
        );
        let (result, exit_code) = map_cmd_result_to_json::<()>(Err(err));
        assert_eq!(exit_code, 20);

        let err = result.unwrap_err();
        let envelope = serde_json::to_value(CliResponse::<()>::from_error(&err)).unwrap();
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["error"]["code"], "remote.query_failed");
        assert_eq!(envelope["error"]["kind"], "query");
        assert_eq!(envelope["error"]["cause"]["message"], "RPC server unavailable");
        assert!(envelope.get("data").is_none());
    }

    #[test]
    fn successful_command_keeps_its_exit_code() {
        let (result, exit_code) = map_cmd_result_to_json(Ok((vec!["a", "b"], 0)));
        assert_eq!(exit_code, 0);
        assert_eq!(result.unwrap(), serde_json::json!(["a", "b"]));
    }
}
