//! CLI-level errors (wraps application, storage and config errors)

use thiserror::Error;

use crate::application::{ErrorKind, NestedSetError};
use crate::config::SettingsError;
use crate::infrastructure::StoreError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    NestedSet(#[from] NestedSetError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("config: {0}")]
    Config(#[from] SettingsError),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => crate::exitcode::CONFIG,
            CliError::Store(e) if e.is_contention() => crate::exitcode::TEMPFAIL,
            CliError::Store(_) => crate::exitcode::IOERR,
            CliError::NestedSet(e) => match e.kind() {
                ErrorKind::Integrity => crate::exitcode::DATAERR,
                ErrorKind::NotFound => crate::exitcode::NOINPUT,
                ErrorKind::InvalidOperation => crate::exitcode::USAGE,
                ErrorKind::Contention => crate::exitcode::TEMPFAIL,
                ErrorKind::Storage => crate::exitcode::IOERR,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::DomainError;

    #[rstest]
    #[case(NestedSetError::from(DomainError::DuplicateId(1)), crate::exitcode::DATAERR)]
    #[case(NestedSetError::TreeNotFound { root_id: Some(3) }, crate::exitcode::NOINPUT)]
    #[case(NestedSetError::from(DomainError::invalid("nope")), crate::exitcode::USAGE)]
    #[case(NestedSetError::from(StoreError::contention("busy")), crate::exitcode::TEMPFAIL)]
    #[case(NestedSetError::from(StoreError::Poisoned("x".into())), crate::exitcode::IOERR)]
    #[case(
        NestedSetError::from(StoreError::LevelOutOfRange { root_id: 1, level: -1 }),
        crate::exitcode::DATAERR
    )]
    fn given_error_kind_when_exiting_then_sysexits_code(#[case] error: NestedSetError, #[case] code: i32) {
        assert_eq!(CliError::from(error).exit_code(), code);
    }
}
