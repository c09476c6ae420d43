//! ESP-IDF compatible partition table and otadata image generator and
//! parser.
//!
//! Produces and inspects the two flash layouts read by `esp-ota-boot`: the
//! partition table at `0x8000` and the two-sector otadata partition holding
//! the OTA select records.

pub mod crc;
pub mod error;
pub mod otadata;
pub mod table;

mod csv;

pub use error::Error;
pub use otadata::{
    OtaData,
    OTA_DATA_SIZE,
};
pub use table::{
    Partition,
    PartitionTable,
};
