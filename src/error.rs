use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Application error taxonomy. The `Display` text of every variant is safe to
/// show to the user; store failures keep their detail out of the message and
/// in the logs only.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// User-correctable input problem, shown inline next to the form.
    #[error("{0}")]
    Validation(String),

    /// Bad credentials. The message stays generic on purpose so it never
    /// reveals whether the email or the password was wrong.
    #[error("email or password incorrect")]
    BadCredentials,

    #[error("email already registered")]
    EmailTaken,

    /// Missing, malformed or expired session token. The session layer treats
    /// this as "logged out", never as a user-visible error.
    #[error("invalid or expired session")]
    Token,

    #[error("something went wrong, please try again")]
    Store(anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Store(e.into())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Store(e)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::BadCredentials => StatusCode::UNAUTHORIZED,
            AppError::EmailTaken => StatusCode::CONFLICT,
            AppError::Token => StatusCode::UNAUTHORIZED,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::BadCredentials => "bad_credentials",
            AppError::EmailTaken => "email_taken",
            AppError::Token => "invalid_token",
            AppError::Store(_) => "store_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Store(e) = &self {
            tracing::error!(error = %e, "store error");
        }
        (
            self.status(),
            axum::Json(json!({
                "error": self.code(),
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_message_stays_generic() {
        let err = AppError::Store(anyhow::anyhow!("connection refused to 10.0.0.5"));
        let msg = err.to_string();
        assert!(!msg.contains("10.0.0.5"));
        assert_eq!(msg, "something went wrong, please try again");
    }

    #[test]
    fn credentials_message_does_not_name_the_field() {
        let msg = AppError::BadCredentials.to_string();
        assert_eq!(msg, "email or password incorrect");
    }
}
