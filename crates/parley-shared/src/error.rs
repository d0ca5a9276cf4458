use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Identifier must be exactly {expected} digits, got {actual} characters")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Identifier must contain only decimal digits")]
    NonDigit,
}
