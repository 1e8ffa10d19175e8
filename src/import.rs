use std::collections::BTreeMap;
use std::io::Read;

use chrono::NaiveDate;

use crate::error::ImportError;
use crate::models::{normalize_category, validate_rating, RecordInput};

/// Reads a wide CSV: `date`, optional `notes`, one column per category.
pub fn parse_records<R: Read>(source: R) -> Result<Vec<RecordInput>, ImportError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
    let headers = reader.headers()?.clone();

    let date_index = headers
        .iter()
        .position(|h| normalize_category(h) == "date")
        .ok_or(ImportError::MissingDateColumn)?;
    let notes_index = headers
        .iter()
        .position(|h| normalize_category(h) == "notes");

    let mut inputs = Vec::new();

    for result in reader.records() {
        let row = result?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();

        let raw_date = row.get(date_index).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|_| {
            ImportError::InvalidDate {
                line,
                value: raw_date.to_string(),
            }
        })?;

        let mut ratings = BTreeMap::new();
        for (index, header) in headers.iter().enumerate() {
            if index == date_index || Some(index) == notes_index {
                continue;
            }
            let category = normalize_category(header);
            let cell = row.get(index).unwrap_or_default();
            if cell.is_empty() {
                continue;
            }
            let value: i32 = cell.parse().map_err(|_| ImportError::InvalidNumber {
                line,
                category: category.clone(),
                value: cell.to_string(),
            })?;
            validate_rating(&category, value)
                .map_err(|source| ImportError::Rating { line, source })?;
            ratings.insert(category, value);
        }

        let notes = notes_index
            .and_then(|index| row.get(index))
            .filter(|notes| !notes.is_empty())
            .map(str::to_string);

        inputs.push(RecordInput {
            date,
            ratings,
            notes,
        });
    }

    Ok(inputs)
}
