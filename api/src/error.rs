use std::{io, num::ParseIntError, str::Utf8Error};

use http::header::ToStrError;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("request is not valid utf-8: {0}")]
    Utf8(#[from] Utf8Error),
    #[error("malformed request")]
    InvalidFormat,
    #[error("unsupported http version")]
    UnsupportedVersion,
    #[error("invalid header value: {0}")]
    HeaderValue(#[from] ToStrError),
    #[error("invalid content length: {0}")]
    ContentLength(#[from] ParseIntError),
    #[error("declared body of {declared} bytes exceeds the {limit} byte limit")]
    ContentLengthTooLarge { declared: usize, limit: usize },
    #[error("client sent a body larger than reported ({received} > {expected})")]
    BodyTooLarge { expected: usize, received: usize },
    #[error(transparent)]
    HttpError(#[from] http::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to write response: {0}")]
    Fmt(#[from] std::fmt::Error),
    #[error("invalid header value: {0}")]
    HeaderValue(#[from] ToStrError),
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
