use thiserror::Error;

/// All errors that can occur in papermind-core.
#[derive(Debug, Error)]
pub enum PapermindError {
    #[error("{0} not found. Set it in your environment or .env file")]
    MissingCredential(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Process exit codes used by the CLI.
#[repr(i32)]
pub enum ExitCode {
    GeneralError = 1,
    MissingCredentials = 2,
    InvalidArgs = 3,
}

pub type Result<T> = std::result::Result<T, PapermindError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_nonzero_and_distinct() {
        let codes = [
            ExitCode::GeneralError as i32,
            ExitCode::MissingCredentials as i32,
            ExitCode::InvalidArgs as i32,
        ];
        assert_eq!(codes, [1, 2, 3]);
    }

    #[test]
    fn test_missing_credential_message() {
        let err = PapermindError::MissingCredential("ZOTERO_API_KEY".into());
        assert!(err.to_string().contains("ZOTERO_API_KEY"));
    }
}
