use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// Every violated field, in declaration order.
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("database error: {0}")]
    Db(String),
}

impl ModelError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Validation(vec![msg.into()])
    }
}

/// Collects field violations and turns them into a single error.
#[derive(Debug, Default)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, msg: impl Into<String>) {
        self.0.push(msg.into());
    }

    pub fn check(&mut self, ok: bool, msg: &str) {
        if !ok {
            self.push(msg);
        }
    }

    pub fn into_result(self) -> Result<(), ModelError> {
        if self.0.is_empty() { Ok(()) } else { Err(ModelError::Validation(self.0)) }
    }
}
