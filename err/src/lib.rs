//! Error taxonomy shared by every vfs crate (§7).

/// Every fallible outcome a store or its command layer can produce.
///
/// Variants map 1:1 onto the taxonomy buckets in §7 of the spec: lookup
/// errors, name errors, operation errors, resource errors, and the fatal
/// errors that can only occur during attach/format.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid filesystem")]
    InvalidStore,
    #[error("cannot create filesystem")]
    CannotCreate,
    #[error("cannot map filesystem (mmap error)")]
    CannotMap,

    #[error("{name} not in directory")]
    NotFound { name: String },
    #[error("{name} not a directory")]
    NotADirectory { name: String },
    #[error("'{name}' is not a file")]
    NotAFile { name: String },
    #[error("'{name}' - name too long")]
    NameTooLong { name: String },
    #[error("cannot create directory '{name}' - entry exists")]
    AlreadyExists { name: String },
    #[error("{name} is not empty")]
    NotEmpty { name: String },
    #[error("{name} is a invalid directory ('.' or '..')")]
    InvalidOp { name: String },

    #[error("disk is full")]
    Full,
    #[error("couldnt found file {path}")]
    HostNotFound { path: String },

    #[error("not implemented")]
    Unimplemented,
}

pub type Result<T> = std::result::Result<T, Error>;
