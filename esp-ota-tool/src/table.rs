use std::fs;
use std::path::Path;

use esp_ota_boot::partition::{
    AppSubType,
    DataSubType,
    PartitionEntry,
    PartitionType,
    MAX_PARTITION_ENTRIES,
    PARTITION_ENTRY_SIZE,
    PARTITION_FLAG_ENCRYPTED,
    PARTITION_LABEL_SIZE,
    PARTITION_MAGIC_MD5,
    PARTITION_TABLE_OFFSET,
    PARTITION_TABLE_SIZE,
};

use crate::error::Error;

pub const PARTITION_FLAG_READONLY: u32 = 0x2;

/// Partitions without an explicit offset are placed from here on, the sector
/// following the partition table.
pub const FIRST_PARTITION_OFFSET: u32 = PARTITION_TABLE_OFFSET + 0x1000;
pub const APP_ALIGNMENT: u32 = 0x10000;
pub const DATA_ALIGNMENT: u32 = 0x1000;

const PARTITION_MAGIC_ERASED: u16 = 0xFFFF;

/// First subtype of the OTA application slots, `ota_N` is `0x10 + N`.
const APP_SUBTYPE_OTA_MIN: u8 = AppSubType::Ota0 as u8;
const APP_OTA_SLOTS: u8 = 16;

const FLAG_NAMES: &[(&str, u32)] = &[
    ("encrypted", PARTITION_FLAG_ENCRYPTED),
    ("readonly", PARTITION_FLAG_READONLY),
];

const DATA_SUBTYPE_NAMES: &[(&str, u8)] = &[
    ("ota", DataSubType::Ota as u8),
    ("phy", DataSubType::Phy as u8),
    ("nvs", DataSubType::Nvs as u8),
    ("coredump", 0x03),
    ("nvs_keys", 0x04),
    ("efuse", 0x05),
    ("undefined", 0x06),
    ("esphttpd", 0x80),
    ("fat", 0x81),
    ("spiffs", 0x82),
    ("littlefs", 0x83),
];

/// A single row of an ESP-IDF partition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Stored as the label of the entry (max 16 bytes).
    pub name: String,
    pub type_: u8,
    pub subtype: u8,
    pub offset: u32,
    pub size: u32,
    pub flags: u32,
}

impl Partition {
    pub fn is_app(&self) -> bool {
        self.type_ == PartitionType::App as u8
    }

    /// Offset alignment ESP-IDF requires for this kind of partition.
    pub fn alignment(&self) -> u32 {
        alignment(self.type_)
    }

    pub fn to_entry(&self) -> Result<PartitionEntry, Error> {
        if self.name.is_empty() || self.name.len() > PARTITION_LABEL_SIZE {
            return Err(Error::InvalidName(self.name.clone()));
        }

        Ok(PartitionEntry {
            type_: self.type_,
            subtype: self.subtype,
            offset: self.offset,
            size: self.size,
            label: PartitionEntry::label_from_str(&self.name),
            flags: self.flags,
        })
    }

    pub fn from_entry(entry: &PartitionEntry) -> Result<Self, Error> {
        let name = entry
            .label_str()
            .ok_or_else(|| Error::InvalidName(format!("{:02x?}", entry.label)))?;

        Ok(Self {
            name: name.to_string(),
            type_: entry.type_,
            subtype: entry.subtype,
            offset: entry.offset,
            size: entry.size,
            flags: entry.flags,
        })
    }
}

/// An ordered list of partitions as found in a partition table CSV or binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionTable {
    pub partitions: Vec<Partition>,
}

impl PartitionTable {
    /// Parse ESP-IDF partition CSV content from a string.
    ///
    /// Empty offsets are assigned automatically, directly behind the previous
    /// partition aligned to 64k for applications and 4k for everything else.
    pub fn from_csv(content: &str) -> Result<Self, Error> {
        crate::csv::parser::parse_csv(content)
    }

    /// Parse an ESP-IDF partition CSV file at the given `path`.
    pub fn from_csv_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Self::from_csv(&content)
    }

    /// Serialize this table to CSV and return the content as a `String`.
    ///
    /// Known types and subtypes are written by name, everything else as hex.
    pub fn to_csv(&self) -> Result<String, Error> {
        crate::csv::writer::write_csv_content(self)
    }

    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        fs::write(path, self.to_csv()?)?;
        Ok(())
    }

    /// Generate the binary partition table: one 32 byte entry per partition,
    /// padded with `0xFF` to the full table size.
    pub fn to_binary(&self) -> Result<Vec<u8>, Error> {
        if self.partitions.len() > MAX_PARTITION_ENTRIES {
            return Err(Error::TooManyPartitions);
        }

        let mut data = vec![0xFFu8; PARTITION_TABLE_SIZE];
        for (chunk, partition) in data
            .chunks_exact_mut(PARTITION_ENTRY_SIZE)
            .zip(&self.partitions)
        {
            chunk.copy_from_slice(&partition.to_entry()?.encode());
        }

        Ok(data)
    }

    pub fn to_binary_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        fs::write(path, self.to_binary()?)?;
        Ok(())
    }

    /// Parse a binary partition table. Reading stops at the first erased
    /// entry or at the MD5 entry.
    pub fn parse_binary(data: &[u8]) -> Result<Self, Error> {
        let mut table = Self::default();

        for (index, chunk) in data
            .chunks_exact(PARTITION_ENTRY_SIZE)
            .take(MAX_PARTITION_ENTRIES)
            .enumerate()
        {
            let magic = u16::from_le_bytes([chunk[0], chunk[1]]);
            if magic == PARTITION_MAGIC_ERASED || magic == PARTITION_MAGIC_MD5 {
                break;
            }

            let raw: &[u8; PARTITION_ENTRY_SIZE] =
                chunk.try_into().map_err(|_| Error::InvalidEntry(index))?;
            let entry = PartitionEntry::decode(raw).ok_or(Error::InvalidEntry(index))?;
            table.partitions.push(Partition::from_entry(&entry)?);
        }

        Ok(table)
    }

    pub fn parse_binary_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let data = fs::read(path)?;
        Self::parse_binary(&data)
    }

    /// The first partition with the given type and subtype.
    pub fn find(&self, type_: u8, subtype: u8) -> Option<&Partition> {
        self.partitions
            .iter()
            .find(|p| p.type_ == type_ && p.subtype == subtype)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.name == name)
    }
}

pub(crate) fn alignment(type_: u8) -> u32 {
    if type_ == PartitionType::App as u8 {
        APP_ALIGNMENT
    } else {
        DATA_ALIGNMENT
    }
}

/// Parses `app`, `data` or a number.
pub(crate) fn parse_type(value: &str) -> Result<u8, Error> {
    match value {
        "app" => Ok(PartitionType::App as u8),
        "data" => Ok(PartitionType::Data as u8),
        _ => parse_u8(value).ok_or_else(|| Error::InvalidType(value.to_string())),
    }
}

/// Parses a subtype name valid for `type_` or a number.
pub(crate) fn parse_subtype(type_: u8, value: &str) -> Result<u8, Error> {
    if let Some(subtype) = parse_u8(value) {
        return Ok(subtype);
    }

    let subtype = match PartitionType::from_repr(type_) {
        Some(PartitionType::App) => match value {
            "factory" => Some(AppSubType::Factory as u8),
            "test" => Some(AppSubType::Test as u8),
            _ => value
                .strip_prefix("ota_")
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|&n| n < APP_OTA_SLOTS)
                .map(|n| APP_SUBTYPE_OTA_MIN + n),
        },
        Some(PartitionType::Data) => DATA_SUBTYPE_NAMES
            .iter()
            .find(|(name, _)| *name == value)
            .map(|&(_, subtype)| subtype),
        None => None,
    };

    subtype.ok_or_else(|| Error::InvalidSubType(value.to_string()))
}

pub(crate) fn type_name(type_: u8) -> String {
    match PartitionType::from_repr(type_) {
        Some(PartitionType::App) => "app".to_string(),
        Some(PartitionType::Data) => "data".to_string(),
        None => format!("{type_:#04x}"),
    }
}

pub(crate) fn subtype_name(type_: u8, subtype: u8) -> String {
    let name = match PartitionType::from_repr(type_) {
        Some(PartitionType::App) => match AppSubType::from_repr(subtype) {
            Some(AppSubType::Factory) => Some("factory".to_string()),
            Some(AppSubType::Test) => Some("test".to_string()),
            _ if (APP_SUBTYPE_OTA_MIN..APP_SUBTYPE_OTA_MIN + APP_OTA_SLOTS).contains(&subtype) => {
                Some(format!("ota_{}", subtype - APP_SUBTYPE_OTA_MIN))
            }
            _ => None,
        },
        Some(PartitionType::Data) => DATA_SUBTYPE_NAMES
            .iter()
            .find(|&&(_, s)| s == subtype)
            .map(|(name, _)| name.to_string()),
        None => None,
    };

    name.unwrap_or_else(|| format!("{subtype:#04x}"))
}

/// Parses a colon separated flag list, e.g. `encrypted:readonly`.
pub(crate) fn parse_flags(value: &str) -> Result<u32, Error> {
    value
        .split(':')
        .map(str::trim)
        .filter(|flag| !flag.is_empty())
        .try_fold(0, |flags, flag| {
            FLAG_NAMES
                .iter()
                .find(|(name, _)| *name == flag)
                .map(|&(_, bit)| flags | bit)
                .ok_or_else(|| Error::InvalidValue(format!("unknown flag: {flag}")))
        })
}

pub(crate) fn flags_name(flags: u32) -> String {
    FLAG_NAMES
        .iter()
        .filter(|&&(_, bit)| flags & bit != 0)
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(":")
}

/// Parses decimal or `0x` prefixed hex numbers with an optional `K` or `M`
/// suffix.
pub(crate) fn parse_number(value: &str) -> Result<u32, Error> {
    let invalid = || Error::InvalidValue(format!("invalid number: {value}"));

    let (digits, multiplier) = match value.as_bytes().last() {
        Some(b'k' | b'K') => (&value[..value.len() - 1], 1024),
        Some(b'm' | b'M') => (&value[..value.len() - 1], 1024 * 1024),
        _ => (value, 1),
    };

    let number = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16)
    } else {
        digits.parse::<u32>()
    }
    .map_err(|_| invalid())?;

    number.checked_mul(multiplier).ok_or_else(invalid)
}

fn parse_u8(value: &str) -> Option<u8> {
    parse_number(value).ok().and_then(|n| u8::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(parse_number("0x9000").unwrap(), 0x9000);
        assert_eq!(parse_number("4096").unwrap(), 4096);
        assert_eq!(parse_number("16K").unwrap(), 0x4000);
        assert_eq!(parse_number("1M").unwrap(), 0x100000);
        assert_eq!(parse_number("0x10k").unwrap(), 0x4000);
        assert!(parse_number("").is_err());
        assert!(parse_number("M").is_err());
        assert!(parse_number("4096M").is_err());
        assert!(parse_number("twelve").is_err());
    }

    #[test]
    fn subtypes() {
        assert_eq!(parse_subtype(0x00, "ota_0").unwrap(), 0x10);
        assert_eq!(parse_subtype(0x00, "ota_15").unwrap(), 0x1F);
        assert!(parse_subtype(0x00, "ota_16").is_err());
        assert_eq!(parse_subtype(0x00, "test").unwrap(), 0x20);
        assert_eq!(parse_subtype(0x01, "ota").unwrap(), 0x00);
        assert_eq!(parse_subtype(0x01, "spiffs").unwrap(), 0x82);
        assert_eq!(parse_subtype(0x40, "0x01").unwrap(), 0x01);
        assert!(parse_subtype(0x01, "factory").is_err());
        assert!(parse_subtype(0x40, "nvs").is_err());

        assert_eq!(subtype_name(0x00, 0x11), "ota_1");
        assert_eq!(subtype_name(0x01, 0x02), "nvs");
        assert_eq!(subtype_name(0x00, 0x30), "0x30");
        assert_eq!(type_name(0x40), "0x40");
    }

    #[test]
    fn flags() {
        assert_eq!(parse_flags("").unwrap(), 0);
        assert_eq!(parse_flags("encrypted").unwrap(), PARTITION_FLAG_ENCRYPTED);
        assert_eq!(
            parse_flags("encrypted:readonly").unwrap(),
            PARTITION_FLAG_ENCRYPTED | PARTITION_FLAG_READONLY
        );
        assert!(parse_flags("secure").is_err());
        assert_eq!(flags_name(0x3), "encrypted:readonly");
        assert_eq!(flags_name(0), "");
    }

    #[test]
    fn label_length() {
        let partition = Partition {
            name: "a_very_long_partition_name".to_string(),
            type_: 0x01,
            subtype: 0x02,
            offset: 0x9000,
            size: 0x1000,
            flags: 0,
        };
        assert!(matches!(partition.to_entry(), Err(Error::InvalidName(_))));
    }
}
