//! Offline rebuild: re-derive the computed fields of every stored row from
//! its raw JSON, then replace the data region in one write. Used to
//! backfill rows after a derivation change.

use std::fmt;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use tweetledger_common::LedgerError;

use crate::codec::{self, RAW_JSON_COLUMN};
use crate::derive::apply_derived;
use crate::traits::TabularStore;

#[derive(Debug, Default)]
pub struct RebuildStats {
    pub rows: u32,
    pub rebuilt: u32,
    pub passed_through: u32,
}

impl fmt::Display for RebuildStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows={} rebuilt={} passed_through={}",
            self.rows, self.rebuilt, self.passed_through
        )
    }
}

pub struct Rebuild<'a> {
    store: &'a dyn TabularStore,
}

impl<'a> Rebuild<'a> {
    pub fn new(store: &'a dyn TabularStore) -> Self {
        Self { store }
    }

    pub async fn run(&self) -> Result<RebuildStats> {
        let header = self
            .store
            .header()
            .await
            .context("reading spreadsheet header")?;
        let json_col = header
            .iter()
            .position(|h| h == RAW_JSON_COLUMN)
            .ok_or_else(|| {
                LedgerError::Config(format!(
                    "missing {RAW_JSON_COLUMN:?} column in the spreadsheet"
                ))
            })?;

        let rows = self.store.data_rows().await.context("reading data rows")?;
        let mut stats = RebuildStats {
            rows: rows.len() as u32,
            ..Default::default()
        };

        let mut rebuilt: Vec<Vec<String>> = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            match rebuild_row(row, json_col, &header) {
                Ok(cells) => {
                    stats.rebuilt += 1;
                    rebuilt.push(cells);
                }
                Err(e) => {
                    // Never drop a row the engine cannot rebuild.
                    warn!(row = i + 1, error = %e, "keeping row as stored");
                    stats.passed_through += 1;
                    rebuilt.push(pad_to_width(row.clone(), header.len()));
                }
            }
        }

        if rebuilt.len() != rows.len() {
            return Err(LedgerError::RowCountMismatch {
                read: rows.len(),
                rebuilt: rebuilt.len(),
            }
            .into());
        }
        self.store
            .overwrite_rows(rebuilt)
            .await
            .context("writing rebuilt rows")?;
        info!(
            rows = stats.rows,
            rebuilt = stats.rebuilt,
            passed_through = stats.passed_through,
            "rebuild complete"
        );
        Ok(stats)
    }
}

fn rebuild_row(row: &[String], json_col: usize, header: &[String]) -> Result<Vec<String>> {
    let raw = row
        .get(json_col)
        .filter(|cell| !cell.is_empty())
        .ok_or_else(|| anyhow!("row has no stored JSON"))?;
    let mut record = codec::decode_record(raw)?;
    let tweet = record
        .get("tweet")
        .filter(|t| t.is_object())
        .cloned()
        .ok_or_else(|| anyhow!("stored JSON has no tweet object"))?;
    apply_derived(&mut record, &tweet);
    Ok(codec::encode_row(&record, header)?.cells)
}

/// The bulk overwrite is rectangular; rows passed through unchanged are
/// sized to the header width (the store returns ragged rows with trailing
/// empties trimmed).
fn pad_to_width(mut row: Vec<String>, width: usize) -> Vec<String> {
    row.resize(width, String::new());
    row
}
