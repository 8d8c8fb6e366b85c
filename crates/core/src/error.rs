/// Boxed error returned by external collaborators (API lookups, fetchers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed post record: {0}")]
    MalformedPost(#[from] serde_json::Error),

    #[error("post record is missing `{field}`")]
    MissingField { field: &'static str },

    #[error("unrecognized media_type: {0}")]
    UnrecognizedMediaType(i64),

    #[error("carousel item {index} is itself a carousel")]
    NestedCarousel { index: usize },

    #[error("post id is not numeric: {0:?}")]
    InvalidPostId(String),

    #[error("post short code is not URL-safe: {0:?}")]
    InvalidShortCode(String),

    #[error("cannot derive a file extension from media URL: {0}")]
    InvalidMediaUrl(String),

    #[error("no media URL {url} recorded for post {post_pk}")]
    UrlNotFound { post_pk: String, url: String },

    #[error("{0}")]
    Collaborator(#[source] BoxError),
}

pub type Result<T> = std::result::Result<T, Error>;
