pub mod error;
pub mod types;

pub use error::{Result, SheetsError};
pub use types::{MajorDimension, ValueRange};

use serde_json::{json, Value};

const BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Client for the spreadsheet values API. Range addressing (A1/R1C1) is the
/// caller's concern; this client treats range strings opaquely.
pub struct SheetsClient {
    client: reqwest::Client,
    token: String,
}

impl SheetsClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }

    /// Read a range of values.
    pub async fn values_get(
        &self,
        spreadsheet_id: &str,
        range: &str,
        dimension: MajorDimension,
    ) -> Result<ValueRange> {
        let url = format!(
            "{}/{}/values/{}?majorDimension={}",
            BASE_URL,
            spreadsheet_id,
            urlencoding::encode(range),
            dimension.as_str()
        );
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// Overwrite a range in place. The range and the value block must agree
    /// on shape; cells outside the block are untouched.
    pub async fn values_update(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<Value>>,
    ) -> Result<()> {
        let url = format!(
            "{}/{}/values/{}?valueInputOption=USER_ENTERED",
            BASE_URL,
            spreadsheet_id,
            urlencoding::encode(range)
        );
        let resp = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "values": values }))
            .send()
            .await?;
        check_status(resp).await?;
        tracing::debug!(range, "values updated");
        Ok(())
    }

    /// Append rows after the last data row of the named region.
    pub async fn values_append(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<Value>>,
    ) -> Result<()> {
        let url = format!(
            "{}/{}/values/{}:append?valueInputOption=USER_ENTERED",
            BASE_URL,
            spreadsheet_id,
            urlencoding::encode(range)
        );
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "values": values }))
            .send()
            .await?;
        check_status(resp).await?;
        tracing::debug!(range, "values appended");
        Ok(())
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SheetsError::Api {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(resp)
}
