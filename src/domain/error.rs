//! Domain error types.

/// A parse error with position information for criteria and shock text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for valuescope.
#[derive(Debug, thiserror::Error)]
pub enum ValuescopeError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown preset '{name}' (available: {})", available.join(", "))]
    UnknownPreset {
        name: String,
        available: Vec<String>,
    },

    #[error("unknown scenario '{name}' (available: {})", available.join(", "))]
    UnknownScenario {
        name: String,
        available: Vec<String>,
    },

    #[error("invalid shock definition: {0}")]
    ShockParse(#[from] ParseError),

    #[error("fetch failed for {symbol}: {reason}")]
    DataFetch { symbol: String, reason: String },

    #[error("invalid data for {symbol}: {reason}")]
    InvalidData { symbol: String, reason: String },

    #[error("fetch for {symbol} timed out after {millis}ms")]
    Timeout { symbol: String, millis: u64 },

    #[error("all {requested} requested symbols failed to fetch")]
    AllSymbolsFailed { requested: usize },

    #[error("portfolio error: {reason}")]
    Portfolio { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ValuescopeError {
    /// Configuration errors are fatal to a single invocation and never
    /// recovered per symbol.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ValuescopeError::ConfigParse { .. }
                | ValuescopeError::ConfigMissing { .. }
                | ValuescopeError::ConfigInvalid { .. }
                | ValuescopeError::UnknownPreset { .. }
                | ValuescopeError::UnknownScenario { .. }
                | ValuescopeError::ShockParse(_)
        )
    }
}

impl From<&ValuescopeError> for std::process::ExitCode {
    fn from(err: &ValuescopeError) -> Self {
        let code: u8 = match err {
            ValuescopeError::Io(_) => 1,
            ValuescopeError::ConfigParse { .. }
            | ValuescopeError::ConfigMissing { .. }
            | ValuescopeError::ConfigInvalid { .. }
            | ValuescopeError::UnknownPreset { .. }
            | ValuescopeError::UnknownScenario { .. }
            | ValuescopeError::ShockParse(_) => 2,
            ValuescopeError::Portfolio { .. } => 3,
            ValuescopeError::DataFetch { .. }
            | ValuescopeError::InvalidData { .. }
            | ValuescopeError::Timeout { .. }
            | ValuescopeError::AllSymbolsFailed { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_context_points_at_position() {
        let err = ParseError {
            message: "unexpected '?'".into(),
            position: 3,
        };
        let rendered = err.display_with_context("pe ? 8");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "pe ? 8");
        assert_eq!(lines[1], "   ^");
        assert!(lines[2].contains("position 3"));
    }

    #[test]
    fn unknown_preset_lists_available() {
        let err = ValuescopeError::UnknownPreset {
            name: "momentum".into(),
            available: vec!["deep-value".into(), "value".into()],
        };
        assert_eq!(
            err.to_string(),
            "unknown preset 'momentum' (available: deep-value, value)"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn fetch_errors_are_not_configuration() {
        let err = ValuescopeError::DataFetch {
            symbol: "7203.T".into(),
            reason: "not found".into(),
        };
        assert!(!err.is_configuration());
    }

    #[test]
    fn exit_codes_separate_config_from_data_errors() {
        let config = ValuescopeError::UnknownScenario {
            name: "x".into(),
            available: vec![],
        };
        let data = ValuescopeError::AllSymbolsFailed { requested: 3 };
        assert_eq!(
            format!("{:?}", std::process::ExitCode::from(&config)),
            format!("{:?}", std::process::ExitCode::from(2))
        );
        assert_eq!(
            format!("{:?}", std::process::ExitCode::from(&data)),
            format!("{:?}", std::process::ExitCode::from(5))
        );
    }
}
