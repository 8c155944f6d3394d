/// Application-level errors
///
/// Nothing here is fatal to a daily run: collaborator failures degrade to
/// defaults after retries, validation failures discard the offending item,
/// and catalog write conflicts are retried (upserts are idempotent). A user
/// or dish that cannot be scored is omitted from the day's output and logged.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;
