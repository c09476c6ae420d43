use esp_ota_boot::partition::MAX_PARTITION_ENTRIES;
use thiserror::Error;

/// Errors that can occur while parsing or generating partition tables and
/// otadata images.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to parse CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("invalid partition type: {0}")]
    InvalidType(String),

    #[error("invalid partition subtype: {0}")]
    InvalidSubType(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("invalid partition name: {0}")]
    InvalidName(String),

    #[error("partition {0} is not aligned to {1:#x}")]
    Misaligned(String, u32),

    #[error("partition {0} overlaps the previous partition")]
    Overlap(String),

    #[error("too many partitions (max {})", MAX_PARTITION_ENTRIES)]
    TooManyPartitions,

    #[error("invalid partition table entry at index {0}")]
    InvalidEntry(usize),

    #[error("image of {0} bytes is too small, at least {1} bytes required")]
    ImageTooSmall(usize, usize),
}
