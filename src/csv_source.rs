use std::io::Read;

use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

/// Reads every CSV record from `reader`. There is no header handling: the first
/// record is data like the rest. Cells are kept as the literal text.
pub fn read_rows<R: Read>(reader: R) -> AppResult<Vec<Vec<String>>> {
    let mut csv_reader = ReaderBuilder::new().has_headers(false).from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    if rows.is_empty() {
        debug!("No rows on input");
        return Err(AppError::EmptyInput);
    }

    info!("Read {} rows from input", rows.len());
    Ok(rows)
}
