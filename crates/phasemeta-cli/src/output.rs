use std::io::{self, Write};

use anyhow::Result;
use prettytable::format::consts::FORMAT_CLEAN;
use prettytable::{Table, row};
use serde::Serialize;

use phasemeta::{Phase, RawMetadataRecord};

use crate::cli::OutputFormat;

pub fn print_records(records: &[RawMetadataRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(records),
        OutputFormat::Table => {
            print_table(records.iter().map(|record| {
                (
                    record.phase_id,
                    record.phase_type.as_deref(),
                    record.product_letter.as_deref(),
                )
            }));
            Ok(())
        }
    }
}

pub fn print_phases(phases: &[Phase], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(phases),
        OutputFormat::Table => {
            print_table(phases.iter().map(|phase| {
                (
                    phase.phase_id,
                    phase.phase_type.as_deref(),
                    phase.product_letter.as_deref(),
                )
            }));
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

fn print_table<'a>(rows: impl Iterator<Item = (i32, Option<&'a str>, Option<&'a str>)>) {
    let mut table = Table::new();
    table.set_format(*FORMAT_CLEAN);
    table.set_titles(row![b => "Phase", "Type", "Product"]);

    for (phase_id, phase_type, product_letter) in rows {
        table.add_row(row![
            r->phase_id,
            phase_type.unwrap_or("-"),
            product_letter.unwrap_or("-")
        ]);
    }

    table.printstd();
}
