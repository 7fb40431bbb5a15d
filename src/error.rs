use thiserror::Error;

/// Why an expression could not be turned into a number.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Unknown character: '{0}'")]
    UnknownCharacter(char),

    #[error("Invalid number: '{0}'")]
    InvalidNumber(String),

    #[error("Nothing to evaluate")]
    Empty,

    #[error("Missing operand")]
    StackUnderflow,

    #[error("{0} values left without an operator")]
    LeftoverOperands(usize),

    #[error("Result is not a finite number: {0}")]
    NonFinite(f64),
}

/// Coarse classification of [`EvalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LexicalReject,
    StructuralMalformed,
    NumericDegenerate,
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::UnknownCharacter(_) | EvalError::InvalidNumber(_) => ErrorKind::LexicalReject,
            EvalError::Empty | EvalError::StackUnderflow | EvalError::LeftoverOperands(_) => {
                ErrorKind::StructuralMalformed
            }
            EvalError::NonFinite(_) => ErrorKind::NumericDegenerate,
        }
    }
}

/// Errors from reading or writing the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(EvalError::UnknownCharacter('a').kind(), ErrorKind::LexicalReject);
        assert_eq!(EvalError::InvalidNumber("1.2.3".into()).kind(), ErrorKind::LexicalReject);
        assert_eq!(EvalError::StackUnderflow.kind(), ErrorKind::StructuralMalformed);
        assert_eq!(EvalError::LeftoverOperands(2).kind(), ErrorKind::StructuralMalformed);
        assert_eq!(EvalError::NonFinite(f64::INFINITY).kind(), ErrorKind::NumericDegenerate);
    }

    #[test]
    fn test_messages() {
        assert_eq!(EvalError::UnknownCharacter('a').to_string(), "Unknown character: 'a'");
        assert_eq!(EvalError::StackUnderflow.to_string(), "Missing operand");
    }
}
