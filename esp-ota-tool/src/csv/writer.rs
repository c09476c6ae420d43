use csv::Writer;

use crate::error::Error;
use crate::table::{
    flags_name,
    subtype_name,
    type_name,
    PartitionTable,
};

const CSV_HEADER: &str = "# Name, Type, SubType, Offset, Size, Flags\n";

/// Serialize a partition table to CSV and return the content as a `String`.
///
/// Offsets are always written, so that the result parses back to the same
/// table regardless of the automatic placement rules.
pub(crate) fn write_csv_content(table: &PartitionTable) -> Result<String, Error> {
    let mut wtr = Writer::from_writer(CSV_HEADER.as_bytes().to_vec());

    for partition in &table.partitions {
        wtr.write_record([
            partition.name.clone(),
            type_name(partition.type_),
            subtype_name(partition.type_, partition.subtype),
            format!("{:#x}", partition.offset),
            format!("{:#x}", partition.size),
            flags_name(partition.flags),
        ])?;
    }

    wtr.flush()?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| Error::IoError(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::InvalidValue(format!("CSV output is not valid UTF-8: {}", e)))
}
