use thiserror::Error;

/// The error type returned by descrambler and card operations.
#[derive(Debug, Error)]
pub enum B25Error {
    #[error("failed on descrambler {operation}() : code={code}")]
    Descramble { operation: &'static str, code: i32 },

    #[error("failed on card {operation}() : code={code}")]
    Card { operation: &'static str, code: i32 },

    #[error("card not present")]
    NoCard,
}

impl B25Error {
    /// Wrap a negative engine status code from the named operation.
    pub fn descramble(operation: &'static str, code: i32) -> Self {
        Self::Descramble { operation, code }
    }

    pub fn card(operation: &'static str, code: i32) -> Self {
        Self::Card { operation, code }
    }
}
