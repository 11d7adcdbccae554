/// Failures raised by the scoring and scenario layers.
///
/// Each variant maps to one recovery policy: lookups, numeric data and oracle
/// failures are skipped at the narrowest scope that keeps a batch moving, a
/// precondition violation aborts before any work starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LcaError {
    /// An activity, database or method could not be resolved.
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// A coefficient or amount was undefined or not a number.
    #[error("invalid numeric data: {0}")]
    NumericData(String),

    /// The scorer could not produce a result.
    #[error("scoring failed: {0}")]
    Oracle(String),

    /// The run configuration is inconsistent.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// A write through the graph store failed.
    #[error("store write failed: {0}")]
    Store(String),
}

impl LcaError {
    pub fn exit_code(&self) -> u8 {
        match self {
            LcaError::Precondition(_) | LcaError::NumericData(_) => 2,
            LcaError::Lookup(_) => 3,
            LcaError::Oracle(_) | LcaError::Store(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<LcaError> for AppError {
    fn from(err: LcaError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
