/// Failure taxonomy for planner operations. Every upstream collaborator call
/// is wrapped into one of these at the boundary of the action that raised it;
/// the API layer decides how each variant is rendered.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Error::NotFound("no matching record".to_string()),
            e => Error::Unavailable(format!("database error: {e}")),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
