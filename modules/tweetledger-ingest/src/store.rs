//! Spreadsheet-backed implementation of the `TabularStore` seam. Owns the
//! region name and all A1/R1C1 addressing; the underlying client treats
//! ranges opaquely.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use sheets_client::{MajorDimension, SheetsClient};

use crate::traits::TabularStore;

/// Name of the sheet (tab) holding the log.
const REGION: &str = "Tweets";

pub struct SheetStore {
    client: SheetsClient,
    spreadsheet_id: String,
}

impl SheetStore {
    pub fn new(client: SheetsClient, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            client,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }
}

#[async_trait]
impl TabularStore for SheetStore {
    async fn header(&self) -> Result<Vec<String>> {
        let range = format!("{REGION}!1:1");
        let values = self
            .client
            .values_get(&self.spreadsheet_id, &range, MajorDimension::Rows)
            .await?;
        let first = values
            .values
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("header row in the spreadsheet is empty"))?;
        Ok(first.iter().map(cell_text).collect())
    }

    async fn column(&self, col: usize) -> Result<Vec<String>> {
        // Data region starts at sheet row 2.
        let range = format!("{REGION}!R2C{col}:C{col}");
        let values = self
            .client
            .values_get(&self.spreadsheet_id, &range, MajorDimension::Columns)
            .await?;
        Ok(values
            .values
            .into_iter()
            .next()
            .unwrap_or_default()
            .iter()
            .map(cell_text)
            .collect())
    }

    async fn data_rows(&self) -> Result<Vec<Vec<String>>> {
        let values = self
            .client
            .values_get(&self.spreadsheet_id, REGION, MajorDimension::Rows)
            .await?;
        Ok(values
            .values
            .into_iter()
            .skip(1) // header row
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    async fn update_row(&self, row: usize, values: Vec<String>) -> Result<()> {
        let sheet_row = row + 1;
        let range = format!("{REGION}!R{sheet_row}C1:R{sheet_row}C{}", values.len());
        self.client
            .values_update(&self.spreadsheet_id, &range, vec![to_cells(values)])
            .await?;
        Ok(())
    }

    async fn append_row(&self, values: Vec<String>) -> Result<()> {
        self.client
            .values_append(&self.spreadsheet_id, REGION, vec![to_cells(values)])
            .await?;
        Ok(())
    }

    async fn overwrite_rows(&self, rows: Vec<Vec<String>>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let range = format!("{REGION}!R2C1:R{}C{width}", rows.len() + 1);
        self.client
            .values_update(
                &self.spreadsheet_id,
                &range,
                rows.into_iter().map(to_cells).collect(),
            )
            .await?;
        Ok(())
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn to_cells(values: Vec<String>) -> Vec<Value> {
    values.into_iter().map(Value::String).collect()
}
