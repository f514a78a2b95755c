use crate::clients::types::{SpreadsheetMetadata, ValueRange};
use crate::clients::REQUEST_TIMEOUT;
use crate::error::{ReportError, Result};
use crate::schema::CellRef;
use crate::traits::SheetSink;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response, Url};

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// One worksheet of a Google spreadsheet, via the Sheets v4 values API.
#[derive(Clone)]
pub struct GoogleSheetsClient {
    client: Client,
    access_token: String,
    base_url: String,
    spreadsheet_id: String,
    worksheet: String,
}

impl GoogleSheetsClient {
    pub fn new(access_token: String, spreadsheet_id: String, worksheet: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            access_token,
            base_url: SHEETS_BASE_URL.to_string(),
            spreadsheet_id,
            worksheet,
        }
    }

    /// A clone of this client pointed at another worksheet of the same spreadsheet.
    pub fn worksheet(&self, worksheet: impl Into<String>) -> Self {
        Self {
            worksheet: worksheet.into(),
            ..self.clone()
        }
    }

    pub(crate) fn range(&self, cell: &CellRef) -> Result<String> {
        Ok(format!(
            "'{}'!{}",
            self.worksheet.replace('\'', "''"),
            cell.a1()?
        ))
    }

    fn values_url(&self, cell: &CellRef) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ReportError::Config(format!("bad sheets URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ReportError::Config(format!("bad sheets URL {}", self.base_url)))?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&self.range(cell)?);
        Ok(url)
    }

    async fn check(&self, res: Response, action: &str) -> Result<Response> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let err_text = res.text().await.unwrap_or_default();
        Err(ReportError::Sheet(format!(
            "{} on '{}' failed (status {}): {}",
            action, self.worksheet, status, err_text
        )))
    }
}

fn cell_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl SheetSink for GoogleSheetsClient {
    async fn write_cell(&self, cell: &CellRef, value: &str) -> Result<()> {
        let url = self.values_url(cell)?;
        let body = ValueRange {
            range: Some(self.range(cell)?),
            values: vec![vec![serde_json::Value::String(value.to_string())]],
        };

        let res = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&body)
            .send()
            .await?;
        self.check(res, "write").await?;
        debug!("Updated {}", self.range(cell)?);
        Ok(())
    }

    async fn read_cell(&self, cell: &CellRef) -> Result<Option<String>> {
        let res = self
            .client
            .get(self.values_url(cell)?)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let body: ValueRange = self.check(res, "read").await?.json().await?;

        Ok(body
            .values
            .first()
            .and_then(|row| row.first())
            .and_then(cell_text))
    }

    async fn row_count(&self) -> Result<u32> {
        let url = format!("{}/{}", self.base_url, self.spreadsheet_id);
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("fields", "sheets.properties")])
            .send()
            .await?;
        let body: SpreadsheetMetadata = self.check(res, "metadata").await?.json().await?;

        body.sheets
            .into_iter()
            .find(|s| s.properties.title == self.worksheet)
            .and_then(|s| s.properties.grid_properties)
            .and_then(|g| g.row_count)
            .ok_or_else(|| {
                ReportError::Sheet(format!("worksheet '{}' not found", self.worksheet))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GoogleSheetsClient {
        GoogleSheetsClient::new(
            "token".to_string(),
            "1AbC".to_string(),
            "CurrentMargin".to_string(),
        )
    }

    #[test]
    fn test_range() {
        assert_eq!(client().range(&CellRef::new(1, 2)).unwrap(), "'CurrentMargin'!B2");
        assert_eq!(
            client()
                .worksheet("Bob's sheet")
                .range(&CellRef::new(0, 7))
                .unwrap(),
            "'Bob''s sheet'!A7"
        );
        assert!(client().range(&CellRef::new(26, 1)).is_err());
    }

    #[test]
    fn test_values_url_is_encoded() {
        let url = client()
            .worksheet("Daily Margin")
            .values_url(&CellRef::new(0, 3))
            .unwrap();
        let path = url.path();
        assert!(path.starts_with("/v4/spreadsheets/1AbC/values/"));
        assert!(!path.contains(' '));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&serde_json::json!("2024-10-19")), Some("2024-10-19".to_string()));
        assert_eq!(cell_text(&serde_json::json!("")), None);
        assert_eq!(cell_text(&serde_json::json!(42)), Some("42".to_string()));
    }
}
