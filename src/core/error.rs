use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,

    ValidationInvalidArgument,

    CredentialNotFound,

    RemoteConnectFailed,
    RemoteQueryFailed,
    RemoteMutationFailed,

    PipelineStageFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

/// Coarse classification used for diagnostics and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Connection,
    Query,
    Mutation,
    Evaluation,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::CredentialNotFound => "credential.not_found",

            ErrorCode::RemoteConnectFailed => "remote.connect_failed",
            ErrorCode::RemoteQueryFailed => "remote.query_failed",
            ErrorCode::RemoteMutationFailed => "remote.mutation_failed",

            ErrorCode::PipelineStageFailed => "pipeline.stage_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::ConfigInvalidJson
            | ErrorCode::ValidationInvalidArgument
            | ErrorCode::CredentialNotFound => ErrorKind::Validation,

            ErrorCode::RemoteConnectFailed => ErrorKind::Connection,
            ErrorCode::RemoteQueryFailed => ErrorKind::Query,
            ErrorCode::RemoteMutationFailed => ErrorKind::Mutation,

            ErrorCode::PipelineStageFailed => ErrorKind::Evaluation,

            ErrorCode::InternalIoError
            | ErrorCode::InternalJsonError
            | ErrorCode::InternalUnexpected => ErrorKind::Internal,
        }
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Connection => "connection",
            ErrorKind::Query => "query",
            ErrorKind::Mutation => "mutation",
            ErrorKind::Evaluation => "evaluation",
            ErrorKind::Internal => "internal",
        }
    }
}

/// The remote call a transport failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStep {
    Connect,
    Identity,
    ActiveAddress,
    Interfaces,
    DnsServers,
    SetDnsServers,
    ReregisterDns,
}

impl RemoteStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteStep::Connect => "connect",
            RemoteStep::Identity => "identity",
            RemoteStep::ActiveAddress => "active_address",
            RemoteStep::Interfaces => "interfaces",
            RemoteStep::DnsServers => "dns_servers",
            RemoteStep::SetDnsServers => "set_dns_servers",
            RemoteStep::ReregisterDns => "reregister_dns",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

/// Underlying failure reported by a transport or child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cause {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Cause {
    pub fn new(message: impl Into<String>, name: Option<String>) -> Self {
        Self {
            message: message.into(),
            name,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFailureDetails {
    pub target: String,
    pub step: RemoteStep,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageFailedDetails {
    pub stage: usize,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub stderr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub cause: Option<Cause>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.message, cause.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            cause: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
    ) -> Self {
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            id,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn credential_not_found(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::CredentialNotFound,
            "Credential not found",
            serde_json::json!({ "name": name }),
        )
        .with_hint(format!(
            "Run 'hostadmin credential set {} --user <user>' to store it",
            name
        ))
    }

    pub fn remote_connect_failed(target: impl Into<String>, cause: Cause) -> Self {
        Self::remote(
            ErrorCode::RemoteConnectFailed,
            "Could not establish a session with the target host",
            target.into(),
            RemoteStep::Connect,
            cause,
        )
        .with_hint("Check that the host is reachable and the credentials are valid")
    }

    pub fn remote_query_failed(target: impl Into<String>, step: RemoteStep, cause: Cause) -> Self {
        Self::remote(
            ErrorCode::RemoteQueryFailed,
            format!("Remote query '{}' failed", step.as_str()),
            target.into(),
            step,
            cause,
        )
    }

    pub fn remote_mutation_failed(
        target: impl Into<String>,
        step: RemoteStep,
        cause: Cause,
    ) -> Self {
        Self::remote(
            ErrorCode::RemoteMutationFailed,
            format!("Remote change '{}' failed", step.as_str()),
            target.into(),
            step,
            cause,
        )
    }

    fn remote(
        code: ErrorCode,
        message: impl Into<String>,
        target: String,
        step: RemoteStep,
        cause: Cause,
    ) -> Self {
        let details = to_details(RemoteFailureDetails {
            target,
            step,
            error: cause.message.clone(),
            error_name: cause.name.clone(),
        });

        let mut err = Self::new(code, message, details);
        err.cause = Some(cause);
        err
    }

    pub fn pipeline_stage_failed(
        stage: usize,
        text: impl Into<String>,
        exit_code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        let stderr = stderr.into();
        let details = to_details(StageFailedDetails {
            stage,
            text: text.into(),
            exit_code,
            stderr: stderr.clone(),
        });

        let mut err = Self::new(
            ErrorCode::PipelineStageFailed,
            format!("Stage {} failed", stage),
            details,
        );
        err.cause = Some(Cause::new(stderr.trim(), None));
        err
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalJsonErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    pub fn to_record(&self) -> ErrorRecord {
        ErrorRecord::from(self)
    }
}

/// Serializable form of [`Error`], used in response envelopes and change records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub code: String,
    pub kind: ErrorKind,
    pub message: String,
    pub details: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Cause>,
}

impl From<&Error> for ErrorRecord {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code.as_str().to_string(),
            kind: err.kind(),
            message: err.message.clone(),
            details: err.details.clone(),
            hints: err.hints.clone(),
            cause: err.cause.clone(),
        }
    }
}
