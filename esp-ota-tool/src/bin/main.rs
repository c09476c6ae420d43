use std::path::PathBuf;

use clap::{
    Parser,
    Subcommand,
};
use esp_ota_boot::partition::AppSlot;
use esp_ota_tool::{
    OtaData,
    PartitionTable,
};

#[derive(Parser)]
#[command(name = "esp-ota-tool")]
#[command(about = "ESP partition table and otadata generator and parser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate partition table binary from CSV file
    Table {
        /// Input CSV file path
        input: PathBuf,

        /// Output binary file path
        output: PathBuf,
    },
    /// Parse partition table binary to CSV file
    Dump {
        /// Input binary file path
        input: PathBuf,

        /// Output CSV file path
        output: PathBuf,
    },
    /// Generate otadata partition binary
    Otadata {
        /// Application slot booted from the image, erased image if omitted
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..2))]
        slot: Option<u8>,

        /// Output binary file path
        output: PathBuf,
    },
    /// Print the records of an otadata partition binary
    Inspect {
        /// Input binary file path
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Table { input, output } => {
            println!("Parsing CSV file: {}", input.display());
            let table = PartitionTable::from_csv_file(&input)?;
            println!("Found {} partitions", table.partitions.len());

            for p in &table.partitions {
                println!("  {:<16} 0x{:08x} 0x{:08x}", p.name, p.offset, p.size);
            }

            table.to_binary_file(&output)?;
            println!("Successfully generated partition table: {}", output.display());

            Ok(())
        }
        Commands::Dump { input, output } => {
            println!("Parsing binary file: {}", input.display());
            let table = PartitionTable::parse_binary_file(&input)?;
            println!("Found {} partitions", table.partitions.len());

            table.to_csv_file(&output)?;
            println!("Successfully parsed partition table to: {}", output.display());

            Ok(())
        }
        Commands::Otadata { slot, output } => {
            let otadata = match slot.and_then(AppSlot::from_repr) {
                Some(slot) => {
                    println!("Generating otadata for {slot:?}");
                    OtaData::for_slot(slot)
                }
                None => {
                    println!("Generating erased otadata");
                    OtaData::erased()
                }
            };

            otadata.to_binary_file(&output)?;
            println!("Successfully generated otadata: {}", output.display());

            Ok(())
        }
        Commands::Inspect { input } => {
            let otadata = OtaData::parse_file(&input)?;

            for (index, record) in otadata.records.iter().enumerate() {
                match record {
                    Some(record) => println!(
                        "slot {index}: seq {} state {} [{}]",
                        record.ota_seq,
                        record
                            .state()
                            .map_or_else(|| format!("{:#04x}", record.ota_state), |s| s.to_string()),
                        hex::encode(record.encode())
                    ),
                    None => println!("slot {index}: invalid"),
                }
            }

            match otadata.active_slot() {
                Some(slot) => println!("active: {slot:?}"),
                None => println!("active: none, the bootloader uses its fallback slot"),
            }

            Ok(())
        }
    }
}
