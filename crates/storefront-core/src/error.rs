use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("a user with this email already exists")]
    DuplicateUser,

    /// Unknown email and wrong password are deliberately the same error.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("content must not be empty")]
    EmptyContent,

    /// Missing and owned-by-someone-else are deliberately the same error.
    #[error("not found or not permitted")]
    NotFoundOrForbidden,

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("you have already rated this product")]
    AlreadyRated,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }
}
