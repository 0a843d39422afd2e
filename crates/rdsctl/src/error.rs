//! Error types for rdsctl
//!
//! Maps core and provider failures onto user-facing errors with suggestions.

use colored::Colorize;
use rdsctl_core::{ConfigError, CoreError, ProviderError};
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: restore failed at step 'create-instance'
///   Failed to create db instance c1-instance-0 for cluster c1
///
///   tip: resources created by earlier steps were left in place
///       rdsctl cluster list --cluster c1
/// ```
pub struct CliDiagnostic {
    message: String,
    detail: Vec<String>,
    tips: Vec<(String, Vec<String>)>,
}

impl CliDiagnostic {
    /// Start a new error diagnostic with the given message.
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            detail: Vec::new(),
            tips: Vec::new(),
        }
    }

    /// Add a detail line below the error message.
    pub fn detail(mut self, text: &str) -> Self {
        self.detail.push(text.to_string());
        self
    }

    /// Add a tip with optional example commands.
    pub fn tip(mut self, description: &str, commands: &[&str]) -> Self {
        self.tips.push((
            description.to_string(),
            commands.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Render without colors
    #[cfg(test)]
    pub fn render_plain(&self) -> String {
        let mut out = format!("error: {}\n", self.message);
        for line in &self.detail {
            out.push_str(&format!("  {}\n", line));
        }
        for (description, commands) in &self.tips {
            out.push_str(&format!("\n  tip: {}\n", description));
            for cmd in commands {
                out.push_str(&format!("      {}\n", cmd));
            }
        }
        out
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        for line in &self.detail {
            eprintln!("  {}", line);
        }

        for (description, commands) in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", description);
            for cmd in commands {
                eprintln!("      {}", cmd);
            }
        }
    }
}

/// Main error type for the rdsctl application
#[derive(Error, Debug)]
pub enum RdsCtlError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("{kind} '{identifier}' not found")]
    NotFound { kind: String, identifier: String },

    /// A workflow step failed; later steps never ran
    #[error("{workflow} failed at step '{step}'")]
    StepFailed {
        workflow: String,
        step: String,
        /// Cluster the workflow was acting on, when known
        cluster: Option<String>,
        message: String,
        last_status: Option<String>,
    },

    #[error("Timeout: {message}")]
    Timeout {
        message: String,
        last_status: Option<String>,
    },

    #[error("Wait failed: {message}")]
    WaitFailed {
        message: String,
        last_status: Option<String>,
    },

    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Request throttled: {message}")]
    Throttled { message: String },

    #[error("API error: {message}")]
    ApiError {
        code: Option<String>,
        message: String,
    },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for rdsctl operations
pub type Result<T> = std::result::Result<T, RdsCtlError>;

impl RdsCtlError {
    /// Wrap a core error, remembering which cluster the command targeted
    pub fn from_core(err: CoreError, cluster: Option<&str>) -> Self {
        match err {
            CoreError::Step { workflow, step, .. } => {
                let root = err.root();
                RdsCtlError::StepFailed {
                    workflow: workflow.to_string(),
                    step: step.to_string(),
                    cluster: cluster.map(str::to_string),
                    message: root.to_string(),
                    last_status: err.last_status().map(str::to_string),
                }
            }
            other => other.into(),
        }
    }

    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            RdsCtlError::Configuration(_) => vec![
                "Show the config file location: rdsctl config path".to_string(),
                "Show the effective configuration: rdsctl config show".to_string(),
            ],
            RdsCtlError::InvalidInput { .. } => vec![
                "Check the command syntax: rdsctl <command> --help".to_string(),
            ],
            RdsCtlError::NotFound { kind, .. } if kind == "snapshot" => vec![
                "List available snapshots: rdsctl snapshot list".to_string(),
                "Check that you're using the correct profile and region".to_string(),
            ],
            RdsCtlError::NotFound { .. } => vec![
                "List available clusters: rdsctl cluster list".to_string(),
                "Check that you're using the correct profile and region".to_string(),
            ],
            RdsCtlError::Timeout { .. } => vec![
                "The operation may still complete; check again later".to_string(),
                "Raise max_attempts under [polling] in the config file".to_string(),
            ],
            RdsCtlError::ConnectionError { .. } => vec![
                "Check network connectivity".to_string(),
                "Verify AWS credentials for the profile: aws sts get-caller-identity".to_string(),
            ],
            RdsCtlError::Throttled { .. } => {
                vec!["Wait a moment and retry the command".to_string()]
            }
            RdsCtlError::ApiError { code: Some(code), .. }
                if code.contains("AccessDenied") || code.contains("Unauthorized") =>
            {
                vec![
                    "Check the IAM permissions of the profile".to_string(),
                    "Use a different profile: rdsctl --profile <name> ...".to_string(),
                ]
            }
            _ => vec![],
        }
    }

    /// Build the diagnostic shown for this error
    pub fn diagnostic(&self) -> CliDiagnostic {
        let mut diag = CliDiagnostic::error(&format!("{}", self));

        match self {
            RdsCtlError::StepFailed {
                step,
                cluster,
                message,
                last_status,
                ..
            } => {
                diag = diag.detail(message);
                if let Some(status) = last_status {
                    diag = diag.detail(&format!("last observed status: {}", status));
                }
                // Lookups run before anything is created
                if step.starts_with("lookup-") {
                    return diag;
                }
                let command = cluster
                    .as_deref()
                    .map(|c| format!("rdsctl cluster list --cluster {}", c));
                let commands: Vec<&str> = command.iter().map(String::as_str).collect();
                diag = diag.tip(
                    "resources created by earlier steps were left in place",
                    &commands,
                );
            }
            RdsCtlError::Timeout {
                last_status: Some(status),
                ..
            }
            | RdsCtlError::WaitFailed {
                last_status: Some(status),
                ..
            } => {
                diag = diag.detail(&format!("last observed status: {}", status));
            }
            _ => {}
        }

        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion, &[]);
        }

        diag
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        self.diagnostic().print();
    }
}

impl From<ProviderError> for RdsCtlError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound { message } => RdsCtlError::ApiError {
                code: None,
                message,
            },
            ProviderError::Throttled { message } => RdsCtlError::Throttled { message },
            ProviderError::Connection { message } => RdsCtlError::ConnectionError { message },
            ProviderError::Rejected { code, message } => RdsCtlError::ApiError { code, message },
        }
    }
}

impl From<CoreError> for RdsCtlError {
    fn from(err: CoreError) -> Self {
        let last_status = err.last_status().map(str::to_string);
        match err {
            CoreError::Step { .. } => RdsCtlError::from_core(err, None),
            CoreError::Validation(message) => RdsCtlError::InvalidInput { message },
            CoreError::NotFound { kind, identifier } => RdsCtlError::NotFound {
                kind: kind.to_string(),
                identifier,
            },
            e @ CoreError::WaitTimeout { .. } => RdsCtlError::Timeout {
                message: e.to_string(),
                last_status,
            },
            e @ (CoreError::WaitFailed { .. } | CoreError::InstanceCreationFailed { .. }) => {
                RdsCtlError::WaitFailed {
                    message: e.to_string(),
                    last_status,
                }
            }
            CoreError::Provider(e) => e.into(),
            CoreError::Config(e) => e.into(),
        }
    }
}

impl From<ConfigError> for RdsCtlError {
    fn from(err: ConfigError) -> Self {
        RdsCtlError::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for RdsCtlError {
    fn from(err: serde_json::Error) -> Self {
        RdsCtlError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<std::io::Error> for RdsCtlError {
    fn from(err: std::io::Error) -> Self {
        RdsCtlError::OutputError {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<anyhow::Error> for RdsCtlError {
    fn from(err: anyhow::Error) -> Self {
        RdsCtlError::OutputError {
            message: format!("{:#}", err),
        }
    }
}
