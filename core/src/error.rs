use thiserror::Error;

pub type Result<T> = std::result::Result<T, FatshellError>;

#[derive(Debug, Error)]
pub enum FatshellError {
    #[error("Invalid image: {0}")]
    Mount(String),

    #[error("Error: Access out of range (offset {offset}, length {len}, image size {size})")]
    OutOfRange { offset: u64, len: u64, size: u64 },

    #[error("Error: {0} not found")]
    NotFound(String),

    #[error("Invalid file name: {0}")]
    NameInvalid(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("File already open: {0}")]
    AlreadyOpen(String),

    #[error("File not open: {0}")]
    NotOpen(String),

    #[error("File not open for {0}")]
    PermissionDenied(&'static str),

    #[error("Error: Cannot open a directory: {0}")]
    IsDirectory(String),

    #[error("Invalid permission: {0}")]
    InvalidMode(String),

    #[error("Filesystem out of space")]
    OutOfSpace,

    #[error("Directory must be empty")]
    NotEmpty,

    #[error("Error: Start parameter out of bounds")]
    StartOutOfBounds,

    #[error("{0}")]
    Usage(&'static str),

    #[error("Invalid command: {0}")]
    UnknownCommand(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
