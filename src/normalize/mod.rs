// src/normalize/mod.rs
//! Consolidate historically inconsistent result-table headers into canonical
//! columns. The IFSC site has labeled the same round many different ways over
//! the years ("Semi-Final", "SemiFinal", "1/2-Final", ...); each alias group
//! collapses every known spelling into one canonical field.

use serde::{Deserialize, Serialize};

/// One scraped result row as ordered `(header, value)` pairs, keyed by the
/// header text exactly as the site rendered it.
pub type RawRecord = Vec<(String, String)>;

/// A canonical field name plus every alias spelling observed for it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct AliasGroup {
    pub canonical: String,
    pub aliases: Vec<String>,
}

/// Column names plus one `Vec<String>` per row, in column order.
/// Rows may be shorter than `headers`; missing cells read as empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    /// Build a table from a record set. Columns are the union of every
    /// record's headers in first-seen order; a record without a given column
    /// contributes an empty cell there.
    pub fn from_records(records: &[RawRecord]) -> Self {
        let mut headers: Vec<String> = Vec::new();
        for record in records {
            for (name, _) in record {
                if !headers.iter().any(|h| h == name) {
                    headers.push(name.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|header| {
                        record
                            .iter()
                            .find(|(name, _)| name == header)
                            .map(|(_, value)| value.clone())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        Self { headers, rows }
    }

    /// Cell at (row, column name), empty string if the row is short.
    pub fn cell(&self, row: usize, header: &str) -> Option<&str> {
        let col = self.headers.iter().position(|h| h == header)?;
        Some(self.rows.get(row)?.get(col).map_or("", String::as_str))
    }
}

/// Apply every alias group to `table` in order. Pure transform: for each
/// group the alias columns present in the table are joined per row with `,`
/// (empty values dropped), the alias columns are removed and the canonical
/// column is appended. A group with no alias present still yields an
/// all-empty canonical column. Other columns pass through untouched.
pub fn consolidate(table: &ResultTable, groups: &[AliasGroup]) -> ResultTable {
    let mut out = table.clone();
    for group in groups {
        out = consolidate_group(&out, group);
    }
    out
}

fn consolidate_group(table: &ResultTable, group: &AliasGroup) -> ResultTable {
    // The canonical name counts as a member of its own group even when the
    // configured alias list omits it; that is what makes a second pass over
    // already-consolidated data a no-op.
    let mut members: Vec<&str> = group.aliases.iter().map(String::as_str).collect();
    if !members.contains(&group.canonical.as_str()) {
        members.push(group.canonical.as_str());
    }

    // Column indices of the aliases actually present, in alias-list order.
    // A spelling listed twice in one group must still hit its column once,
    // or the join would repeat the cell's value.
    let mut present: Vec<usize> = Vec::new();
    for name in &members {
        if let Some(i) = table.headers.iter().position(|h| h == name) {
            if !present.contains(&i) {
                present.push(i);
            }
        }
    }

    let kept: Vec<usize> = (0..table.headers.len())
        .filter(|i| !present.contains(i))
        .collect();

    let mut headers: Vec<String> = kept.iter().map(|&i| table.headers[i].clone()).collect();
    headers.push(group.canonical.clone());

    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut cells: Vec<String> = kept
                .iter()
                .map(|&i| row.get(i).cloned().unwrap_or_default())
                .collect();
            let joined = present
                .iter()
                .filter_map(|&i| row.get(i))
                .filter(|value| !value.is_empty())
                .cloned()
                .collect::<Vec<_>>()
                .join(",");
            cells.push(joined);
            cells
        })
        .collect();

    ResultTable { headers, rows }
}
