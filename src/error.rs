use thiserror::Error;

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
}

#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error("invalid container id {found:?} at offset {offset:#x}")]
    InvalidContainerId { found: [u8; 4], offset: usize },
    #[error(
        "node at offset {offset:#x} declares {declared} content bytes but only {available} remain"
    )]
    TruncatedNode {
        offset: usize,
        declared: i64,
        available: usize,
    },
    #[error("unexpected end of data at offset {offset:#x}")]
    UnexpectedEof { offset: usize },
    #[error("unsupported mesh format version {name:?}")]
    UnsupportedFormatVersion { name: String },
    #[error("LOD {lod} has missing or empty {what} data")]
    IncompleteLodData { lod: usize, what: &'static str },
    #[error("root form {found:?} is not a mesh")]
    NotAMesh { found: String },
    #[error("invalid scene geometry: {detail}")]
    InvalidScene { detail: String },
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("error interpreting UTF-8 string: {err}")]
    Utf8Error {
        #[from]
        err: std::str::Utf8Error,
    },
    #[cfg(feature = "json")]
    #[error("error serializing or deserializing json: {err}")]
    SerdeJson {
        #[from]
        err: serde_json::Error,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error { kind: err.into() }
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error { kind: err.into() }
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error { kind: err.into() }
    }
}

pub type IResult<T> = Result<T, Error>;

/// A recoverable conversion fault.
///
/// Warnings are collected into a list returned alongside a successful result
/// rather than aborting the conversion; the faulting item degrades to a
/// documented default instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Warning {
    #[error("material resolution: {detail}")]
    MaterialResolution { detail: String },
    #[error("LOD {lod} skipped: {detail}")]
    LodSkipped { lod: usize, detail: String },
}
