// src/store/mod.rs
//! CSV persistence for normalized result tables, plus read-back and merge of
//! a previous run's file.

use anyhow::{Context, Result};
use csv::{Reader, Writer};
use std::path::Path;
use tracing::debug;

use crate::normalize::ResultTable;

/// Write `table` to `path`, one CSV record per row. Short rows are padded so
/// every record has one field per header.
pub fn write_csv(table: &ResultTable, path: &Path) -> Result<()> {
    let mut writer =
        Writer::from_path(path).with_context(|| format!("creating {:?}", path))?;
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        let mut record = row.clone();
        record.resize(table.headers.len(), String::new());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = table.rows.len(), "csv written");
    Ok(())
}

/// Read a results file back into a table.
pub fn read_csv(path: &Path) -> Result<ResultTable> {
    let mut reader = Reader::from_path(path).with_context(|| format!("opening {:?}", path))?;
    let headers = reader
        .headers()
        .with_context(|| format!("reading header row of {:?}", path))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("reading row of {:?}", path))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(ResultTable { headers, rows })
}

/// Concatenate two tables under the union of their columns, new rows first.
/// Cells of a column the other table lacks read as empty.
pub fn merge_tables(new: &ResultTable, old: &ResultTable) -> ResultTable {
    let mut headers = new.headers.clone();
    for header in &old.headers {
        if !headers.contains(header) {
            headers.push(header.clone());
        }
    }

    let project = |table: &ResultTable| -> Vec<Vec<String>> {
        table
            .rows
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .map(|header| {
                        table
                            .headers
                            .iter()
                            .position(|h| h == header)
                            .and_then(|i| row.get(i))
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect()
    };

    let mut rows = project(new);
    rows.extend(project(old));
    ResultTable { headers, rows }
}

/// Persist `table` at `path`. With `merge_existing` set and a file already
/// present, its rows are kept and appended after the new ones.
pub fn save(table: &ResultTable, path: &Path, merge_existing: bool) -> Result<()> {
    if merge_existing && path.exists() {
        let previous = read_csv(path)?;
        return write_csv(&merge_tables(table, &previous), path);
    }
    write_csv(table, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn table(headers: &[&str], rows: &[&[&str]]) -> ResultTable {
        ResultTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn write_then_read_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("boulder_results.csv");
        let original = table(
            &["Rank", "FIRST", "Semifinal"],
            &[&["1", "Janja", "4t"], &["2", "Akiyo", "3t"]],
        );
        write_csv(&original, &path)?;
        assert_eq!(read_csv(&path)?, original);
        Ok(())
    }

    #[test]
    fn short_rows_are_padded_on_write() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("results.csv");
        let original = table(&["Rank", "FIRST"], &[&["1"]]);
        write_csv(&original, &path)?;
        let read_back = read_csv(&path)?;
        assert_eq!(read_back.rows, vec![vec!["1", ""]]);
        Ok(())
    }

    #[test]
    fn merge_takes_union_of_columns_new_rows_first() {
        let new = table(&["Rank", "Semifinal"], &[&["1", "4t"]]);
        let old = table(&["Rank", "Final"], &[&["1", "2t"]]);
        let merged = merge_tables(&new, &old);
        assert_eq!(merged.headers, vec!["Rank", "Semifinal", "Final"]);
        assert_eq!(merged.rows, vec![vec!["1", "4t", ""], vec!["1", "", "2t"]]);
    }

    #[test]
    fn save_without_merge_overwrites() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("results.csv");
        save(&table(&["Rank"], &[&["1"]]), &path, false)?;
        save(&table(&["Rank"], &[&["2"]]), &path, false)?;
        assert_eq!(read_csv(&path)?.rows, vec![vec!["2"]]);
        Ok(())
    }

    #[test]
    fn save_with_merge_keeps_previous_rows() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("results.csv");
        save(&table(&["Rank"], &[&["1"]]), &path, true)?;
        save(&table(&["Rank"], &[&["2"]]), &path, true)?;
        assert_eq!(read_csv(&path)?.rows, vec![vec!["2"], vec!["1"]]);
        Ok(())
    }
}
