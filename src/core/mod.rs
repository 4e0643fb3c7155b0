//! Process-level concerns shared by the binary and the library: exit codes
//! and progress output.

pub mod output;

use crate::error::MigratorError;

/// Exit codes of the `ado-migrator` binary.
///
/// Per-item failures never change the exit code; they are reported in the
/// run summary. Only problems that stop the run do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Setup succeeded and the migration ran to the end.
    Success = 0,

    /// Configuration, argument or setup error.
    GeneralError = 1,

    /// A personal access token was rejected, during setup or mid-run.
    AuthenticationFailed = 2,
}

impl ExitCode {
    /// Returns the numeric exit code value.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns a human-readable description of the exit code.
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Migration finished",
            ExitCode::GeneralError => "Configuration or setup error",
            ExitCode::AuthenticationFailed => "Authentication against Azure DevOps failed",
        }
    }

    /// Maps a fatal run error to its exit code.
    pub fn for_error(error: &MigratorError) -> Self {
        if error.is_auth_failure() {
            ExitCode::AuthenticationFailed
        } else {
            ExitCode::GeneralError
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code())
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}
