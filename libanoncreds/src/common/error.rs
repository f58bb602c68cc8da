use std::fmt;

use thiserror::Error;

pub mod prelude {
    pub use super::{err_msg, input_err, Error, ErrorKind, Result, ResultExt};
}

#[derive(Debug, Error)]
pub struct Error {
    kind: ErrorKind,
    msg: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ErrorKind {
    // General errors
    #[error("Input error")]
    Input,
    #[error("Unexpected error")]
    Unexpected,
    // Key generation errors
    #[error("Key generation failed")]
    KeyGeneration,
    #[error("Malformed public key")]
    PublicKeyMalformed,
    // Issuance errors
    #[error("Invalid credential request proof")]
    InvalidRequestProof,
    #[error("Credential processing mismatch")]
    ProcessingMismatch,
    // Presentation errors
    #[error("Unsatisfiable presentation request")]
    UnsatisfiableRequest,
}

impl Error {
    pub fn new(
        kind: ErrorKind,
        msg: Option<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self { kind, msg, source }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn extend<D>(self, msg: D) -> Error
    where
        D: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Error::new(self.kind, Some(msg.to_string()), self.source)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.msg) {
            (ErrorKind::Input, None) => write!(f, "{}", self.kind),
            (ErrorKind::Input, Some(msg)) => f.write_str(msg),
            (kind, None) => write!(f, "{}", kind),
            (kind, Some(msg)) => write!(f, "{}: {}", kind, msg),
        }?;
        if let Some(ref source) = self.source {
            write!(f, "\n{}", source)?;
        }
        Ok(())
    }
}

impl From<Error> for ErrorKind {
    fn from(error: Error) -> ErrorKind {
        error.kind
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error::new(kind, None, None)
    }
}

impl From<crate::utils::validation::ValidationError> for Error {
    fn from(err: crate::utils::validation::ValidationError) -> Self {
        Error::new(ErrorKind::Input, Some(err.to_string()), None)
    }
}

impl<M> From<(ErrorKind, M)> for Error
where
    M: fmt::Display + Send + Sync + 'static,
{
    fn from((kind, msg): (ErrorKind, M)) -> Error {
        Error::new(kind, Some(msg.to_string()), None)
    }
}

pub fn err_msg<M>(kind: ErrorKind, msg: M) -> Error
where
    M: fmt::Display + Send + Sync + 'static,
{
    (kind, msg.to_string()).into()
}

pub fn input_err<M>(msg: M) -> Error
where
    M: fmt::Display + Send + Sync + 'static,
{
    (ErrorKind::Input, msg.to_string()).into()
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait ResultExt<T, E> {
    fn map_err_string(self) -> std::result::Result<T, String>;
    fn map_input_err<F, M>(self, mapfn: F) -> Result<T>
    where
        F: FnOnce() -> M,
        M: fmt::Display + Send + Sync + 'static;
    fn with_err_msg<M>(self, kind: ErrorKind, msg: M) -> Result<T>
    where
        M: fmt::Display + Send + Sync + 'static;
    fn with_input_err<M>(self, msg: M) -> Result<T>
    where
        M: fmt::Display + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn map_err_string(self) -> std::result::Result<T, String> {
        self.map_err(|err| err.to_string())
    }

    fn map_input_err<F, M>(self, mapfn: F) -> Result<T>
    where
        F: FnOnce() -> M,
        M: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|err| {
            Error::new(
                ErrorKind::Input,
                Some(mapfn().to_string()),
                Some(Box::new(err)),
            )
        })
    }

    fn with_err_msg<M>(self, kind: ErrorKind, msg: M) -> Result<T>
    where
        M: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|err| Error::new(kind, Some(msg.to_string()), Some(Box::new(err))))
    }

    fn with_input_err<M>(self, msg: M) -> Result<T>
    where
        M: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|err| {
            Error::new(
                ErrorKind::Input,
                Some(msg.to_string()),
                Some(Box::new(err)),
            )
        })
    }
}
