pub mod user;

use axum::http::StatusCode;

use crate::error::Error;

/// Map a planner error onto the status the boundary reports. The failing
/// operation is abandoned with a message; the session stays usable.
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::Unavailable(_) => StatusCode::BAD_GATEWAY,
        Error::PermissionDenied(_) => StatusCode::FORBIDDEN,
        Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
