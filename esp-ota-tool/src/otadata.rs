use std::fs;
use std::path::Path;

use esp_ota_boot::ota::{
    active_record,
    LedgerSlot,
    OtaSelectRecord,
    FLASH_SECTOR_SIZE,
    OTA_SELECT_RECORD_SIZE,
};
use esp_ota_boot::partition::AppSlot;

use crate::crc::crc32_le;
use crate::error::Error;

/// Size of an otadata partition: one sector per record.
pub const OTA_DATA_SIZE: usize = 2 * FLASH_SECTOR_SIZE;

/// Content of an otadata partition. `None` stands for a record failing
/// validation, erased flash included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtaData {
    pub records: [Option<OtaSelectRecord>; 2],
}

impl OtaData {
    /// Both records erased, the bootloader falls back to its default slot.
    pub fn erased() -> Self {
        Self::default()
    }

    /// A fresh ledger whose only record selects `slot`.
    pub fn for_slot(slot: AppSlot) -> Self {
        let seq = slot.index() as u32 + 1;
        Self {
            records: [Some(OtaSelectRecord::new(seq, crc32_le)), None],
        }
    }

    /// Generate the partition image, records at the start of each sector and
    /// `0xFF` everywhere else.
    pub fn to_binary(&self) -> Vec<u8> {
        let mut data = vec![0xFFu8; OTA_DATA_SIZE];
        for (sector, record) in data.chunks_exact_mut(FLASH_SECTOR_SIZE).zip(&self.records) {
            if let Some(record) = record {
                sector[..OTA_SELECT_RECORD_SIZE].copy_from_slice(&record.encode());
            }
        }
        data
    }

    pub fn to_binary_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        fs::write(path, self.to_binary())?;
        Ok(())
    }

    /// Parse an otadata image. Anything past the two sectors is ignored.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        if data.len() < OTA_DATA_SIZE {
            return Err(Error::ImageTooSmall(data.len(), OTA_DATA_SIZE));
        }

        let mut otadata = Self::default();
        for (sector, record) in data
            .chunks_exact(FLASH_SECTOR_SIZE)
            .zip(otadata.records.iter_mut())
        {
            let mut raw = [0u8; OTA_SELECT_RECORD_SIZE];
            raw.copy_from_slice(&sector[..OTA_SELECT_RECORD_SIZE]);
            *record = OtaSelectRecord::decode(&raw, crc32_le).ok();
        }

        Ok(otadata)
    }

    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let data = fs::read(path)?;
        Self::parse(&data)
    }

    /// The record the bootloader follows.
    pub fn active(&self) -> Option<(LedgerSlot, OtaSelectRecord)> {
        active_record(&self.records)
    }

    /// Application slot the bootloader picks from this image.
    pub fn active_slot(&self) -> Option<AppSlot> {
        self.active().and_then(|(_, record)| record.app_slot())
    }
}
