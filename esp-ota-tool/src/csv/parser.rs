use crate::error::Error;
use crate::table::{
    alignment,
    parse_flags,
    parse_number,
    parse_subtype,
    parse_type,
    Partition,
    PartitionTable,
    FIRST_PARTITION_OFFSET,
};

use esp_ota_boot::partition::{
    MAX_PARTITION_ENTRIES,
    PARTITION_LABEL_SIZE,
};

/// `# Name, Type, SubType, Offset, Size, Flags`, offset and flags may be
/// empty or missing.
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    name: String,
    #[serde(rename = "type")]
    partition_type: String,
    subtype: String,
    #[serde(default)]
    offset: String,
    #[serde(default)]
    size: String,
    #[serde(default)]
    flags: String,
}

/// Parse ESP-IDF partition CSV content from a string into a
/// [`PartitionTable`].
pub(crate) fn parse_csv(content: &str) -> Result<PartitionTable, Error> {
    let mut table = PartitionTable::default();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut next_offset = FIRST_PARTITION_OFFSET;

    for result in reader.deserialize() {
        let row: CsvRow = result?;
        let partition = parse_row(row, next_offset)?;

        next_offset = partition
            .offset
            .checked_add(partition.size)
            .ok_or_else(|| Error::InvalidValue(format!("{} exceeds 4G", partition.name)))?;
        table.partitions.push(partition);
    }

    if table.partitions.len() > MAX_PARTITION_ENTRIES {
        return Err(Error::TooManyPartitions);
    }

    Ok(table)
}

fn parse_row(row: CsvRow, next_offset: u32) -> Result<Partition, Error> {
    if row.name.is_empty() || row.name.len() > PARTITION_LABEL_SIZE {
        return Err(Error::InvalidName(row.name));
    }

    let type_ = parse_type(&row.partition_type)?;
    let subtype = parse_subtype(type_, &row.subtype)?;
    let alignment = alignment(type_);

    let offset = if row.offset.is_empty() {
        next_offset.next_multiple_of(alignment)
    } else {
        let offset = parse_number(&row.offset)?;
        if !offset.is_multiple_of(alignment) {
            return Err(Error::Misaligned(row.name, alignment));
        }
        if offset < next_offset {
            return Err(Error::Overlap(row.name));
        }
        offset
    };

    if row.size.is_empty() {
        return Err(Error::InvalidValue(format!("{} has no size", row.name)));
    }
    let size = parse_number(&row.size)?;
    if size == 0 {
        return Err(Error::InvalidValue(format!("{} has a size of 0", row.name)));
    }

    Ok(Partition {
        flags: parse_flags(&row.flags)?,
        name: row.name,
        type_,
        subtype,
        offset,
        size,
    })
}
