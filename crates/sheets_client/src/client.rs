//! Google Sheets HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). A client holds the
//! authenticated HTTP handle plus a mutable session target: spreadsheet id
//! and sheet name. Every data operation validates that target, composes a
//! `Sheet!Range` address, calls the Sheets v4 API and maps the result.
//!
//! No retries, no backoff. Multi-step operations (insert, delete) are not
//! rolled back when a later step fails.

use std::path::PathBuf;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::auth::{read_credentials, resolve_credentials_path, ServiceAccountKey, TokenSource};
use crate::error::{extract_google_error, RemoteFailure, SheetsError};
use crate::options::ClientOptions;
use crate::values::{column_index, find_row_number, Row};

const METADATA_CONTEXT: &str = "unable to retrieve spreadsheet metadata";
const READ_CONTEXT: &str = "unable to retrieve data from Google Sheets";
const APPEND_CONTEXT: &str = "unable to append data to Google Sheets";
const INSERT_CONTEXT: &str = "unable to insert rows into Google Sheets";
const DELETE_CONTEXT: &str = "unable to delete row from Google Sheets";

/// Google Sheets API client (blocking).
///
/// Not `Sync`: the session target is plain state, changed through `&mut self`.
pub struct SheetsClient {
    http: reqwest::blocking::Client,
    api_base: String,
    tokens: TokenSource,
    spreadsheet_id: String,
    sheet_name: String,
}

/// Properties of one sheet (tab) in a spreadsheet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    #[serde(default)]
    pub sheet_id: i64,
    pub title: String,
    #[serde(default)]
    pub index: i64,
}

#[derive(Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct ValueRange {
    // Absent when the range holds no data
    #[serde(default)]
    values: Vec<Row>,
}

impl SheetsClient {
    /// Create a client from service-account JSON key bytes.
    ///
    /// Exchanges the key for an access token right away; this is the only
    /// request made during construction.
    pub fn new(credentials: &[u8]) -> Result<Self, SheetsError> {
        Self::with_options(credentials, ClientOptions::default())
    }

    pub fn with_options(credentials: &[u8], options: ClientOptions) -> Result<Self, SheetsError> {
        let key = ServiceAccountKey::from_json(credentials)?;
        let http = build_http(&options)?;
        let tokens = TokenSource::service_account(
            key,
            options.token_uri.as_deref(),
            &options.scope,
            &http,
        )?;

        log::debug!("authenticated Sheets client for {}", options.api_base_trimmed());
        Ok(Self::assemble(http, tokens, options))
    }

    /// Create a client from a service-account key file on disk.
    ///
    /// `None` looks the file up via `GOOGLE_APPLICATION_CREDENTIALS`, then the
    /// default config location (see [`resolve_credentials_path`]).
    pub fn from_credentials_file(path: Option<PathBuf>, options: ClientOptions) -> Result<Self, SheetsError> {
        let path = resolve_credentials_path(path)?;
        log::debug!("reading service account key from {}", path.display());
        let credentials = read_credentials(&path)?;
        Self::with_options(&credentials, options)
    }

    /// Create a client around an already-issued bearer token. No request is
    /// made and the token is never refreshed.
    pub fn with_access_token(token: impl Into<String>, options: ClientOptions) -> Result<Self, SheetsError> {
        let http = build_http(&options)?;
        Ok(Self::assemble(http, TokenSource::Static(token.into()), options))
    }

    fn assemble(http: reqwest::blocking::Client, tokens: TokenSource, options: ClientOptions) -> Self {
        Self {
            http,
            api_base: options.api_base_trimmed().to_string(),
            tokens,
            spreadsheet_id: options.spreadsheet_id,
            sheet_name: options.sheet_name,
        }
    }

    // ── Session target ──────────────────────────────────────────────

    pub fn set_spreadsheet_id(&mut self, spreadsheet_id: impl Into<String>) {
        self.spreadsheet_id = spreadsheet_id.into();
    }

    pub fn set_sheet_name(&mut self, sheet_name: impl Into<String>) {
        self.sheet_name = sheet_name.into();
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Local check only: does not confirm the spreadsheet or sheet exists.
    fn validate_configuration(&self) -> Result<(), SheetsError> {
        if self.spreadsheet_id.is_empty() {
            return Err(SheetsError::Configuration("spreadsheet id is not set".into()));
        }
        if self.sheet_name.is_empty() {
            return Err(SheetsError::Configuration("sheet name is not set".into()));
        }
        Ok(())
    }

    /// `Sheet1` + `A1:B4` → `Sheet1!A1:B4`
    fn address(&self, range: &str) -> String {
        format!("{}!{}", self.sheet_name, range)
    }

    // ── Operations ──────────────────────────────────────────────────

    /// List every sheet in the configured spreadsheet.
    /// GET /v4/spreadsheets/:id?fields=sheets.properties
    pub fn sheets(&self) -> Result<Vec<SheetProperties>, SheetsError> {
        if self.spreadsheet_id.is_empty() {
            return Err(SheetsError::Configuration("spreadsheet id is not set".into()));
        }

        let mut url = self.endpoint(&[&self.spreadsheet_id])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties");

        let response = self.get(url, METADATA_CONTEXT)?;
        let metadata: SpreadsheetMetadata = parse_json(response, METADATA_CONTEXT)?;
        Ok(metadata.sheets.into_iter().map(|s| s.properties).collect())
    }

    /// Resolve the configured sheet name to its numeric sheet id.
    ///
    /// Exact, case-sensitive title match. Not cached: every call costs one
    /// metadata request, so a renamed sheet is always seen.
    pub fn sheet_id(&self) -> Result<i64, SheetsError> {
        self.validate_configuration()?;

        self.sheets()?
            .into_iter()
            .find(|s| s.title == self.sheet_name)
            .map(|s| s.sheet_id)
            .ok_or_else(|| {
                SheetsError::NotFound(format!(
                    "sheet {:?} not found in spreadsheet {}",
                    self.sheet_name, self.spreadsheet_id,
                ))
            })
    }

    /// Read a range of the configured sheet, e.g. `"A1:B4"`.
    ///
    /// Rows come back exactly as the API returns them: trailing empty cells
    /// are trimmed, so rows may differ in length.
    pub fn read_data(&self, range: &str) -> Result<Vec<Row>, SheetsError> {
        self.validate_configuration()?;

        let address = self.address(range);
        let url = self.endpoint(&[&self.spreadsheet_id, "values", &address])?;

        let response = self.get(url, READ_CONTEXT)?;
        let body: ValueRange = parse_json(response, READ_CONTEXT)?;
        Ok(body.values)
    }

    /// Append rows to the table anchored at `start_address` (e.g. `"A1"`).
    ///
    /// Values are written literally (`valueInputOption=RAW`), never parsed
    /// as formulas. Appending zero rows succeeds without a request.
    pub fn append_data(&self, data: &[Row], start_address: &str) -> Result<(), SheetsError> {
        self.validate_configuration()?;
        if start_address.is_empty() {
            return Err(SheetsError::Configuration(
                "append requires a start address".into(),
            ));
        }

        let address = self.address(start_address);
        if data.is_empty() {
            log::debug!("nothing to append at {}", address);
            return Ok(());
        }

        let mut url = self.endpoint(&[
            &self.spreadsheet_id,
            "values",
            &format!("{}:append", address),
        ])?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let body = serde_json::json!({
            "majorDimension": "ROWS",
            "values": data,
        });
        self.post_json(url, &body, APPEND_CONTEXT)?;
        Ok(())
    }

    /// Insert `data` as new rows directly below 1-based row `position`.
    ///
    /// Position 1 is the header row, so `1` inserts right after the header.
    /// Runs in three steps: resolve the sheet id, insert blank rows
    /// (`startIndex = position`), then append the values at `A{position+1}`.
    /// If the last step fails the blank rows stay in the sheet.
    pub fn insert_rows_after_position(&self, data: &[Row], position: u64) -> Result<(), SheetsError> {
        self.validate_configuration()?;
        if data.is_empty() {
            return Ok(());
        }

        let count = data.len() as u64;
        let (end, anchor_row) = position
            .checked_add(count)
            .zip(position.checked_add(1))
            .ok_or_else(|| {
                SheetsError::Configuration(format!("insert position {} is out of range", position))
            })?;

        let sheet_id = self.sheet_id()?;

        let request = serde_json::json!({
            "requests": [{
                "insertDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": position,
                        "endIndex": end,
                    },
                    "inheritFromBefore": false,
                }
            }]
        });
        self.batch_update(&request, INSERT_CONTEXT)?;

        let anchor = format!("A{}", anchor_row);
        self.append_data(data, &anchor).inspect_err(|e| {
            log::warn!(
                "{} blank row(s) inserted after row {} of {:?} but filling them failed: {}",
                count, position, self.sheet_name, e,
            );
        })
    }

    /// Insert `data` directly below the header row.
    pub fn insert_rows_at_beginning(&self, data: &[Row]) -> Result<(), SheetsError> {
        self.insert_rows_after_position(data, 1)
    }

    /// Delete the first row of `data` whose cell in `column` renders as `value`.
    ///
    /// `data` must mirror the live sheet row-for-row (typically the result of
    /// an earlier [`read_data`](Self::read_data) starting at row 1). The match
    /// is not re-checked against the sheet: if rows moved since the read, a
    /// different row is deleted.
    pub fn delete_row(&self, data: &[Row], column: &str, value: &str) -> Result<(), SheetsError> {
        self.validate_configuration()?;
        if column_index(column).is_none() {
            return Err(SheetsError::Configuration(format!(
                "invalid column reference {:?}",
                column,
            )));
        }

        let row_number = find_row_number(data, column, value).ok_or_else(|| {
            SheetsError::NotFound(format!(
                "unable to find the value {:?} in column {}",
                value, column,
            ))
        })?;

        let sheet_id = self.sheet_id()?;
        let start = (row_number - 1) as u64;

        let request = serde_json::json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start,
                        "endIndex": start + 1,
                    }
                }
            }]
        });
        self.batch_update(&request, DELETE_CONTEXT)
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// `{api_base}/v4/spreadsheets/{segments...}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = Url::parse(&self.api_base).map_err(|e| {
            SheetsError::Configuration(format!("invalid api_base {:?}: {}", self.api_base, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                SheetsError::Configuration(format!("api_base {:?} cannot be a base URL", self.api_base))
            })?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(segments);

        Ok(url)
    }

    fn batch_update(&self, request: &serde_json::Value, context: &str) -> Result<(), SheetsError> {
        let url = self.endpoint(&[&format!("{}:batchUpdate", self.spreadsheet_id)])?;
        self.post_json(url, request, context)?;
        Ok(())
    }

    fn get(&self, url: Url, context: &str) -> Result<reqwest::blocking::Response, SheetsError> {
        let token = self.tokens.bearer(&self.http)?;
        log::debug!("GET {}", url.path());

        let response = self.http.get(url)
            .bearer_auth(token)
            .send()
            .map_err(|e| SheetsError::remote(context, RemoteFailure::Network(e.to_string())))?;

        check_status(response, context)
    }

    fn post_json(
        &self,
        url: Url,
        body: &serde_json::Value,
        context: &str,
    ) -> Result<reqwest::blocking::Response, SheetsError> {
        let token = self.tokens.bearer(&self.http)?;
        log::debug!("POST {}", url.path());

        let response = self.http.post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .map_err(|e| SheetsError::remote(context, RemoteFailure::Network(e.to_string())))?;

        check_status(response, context)
    }
}

// ── Free functions ──────────────────────────────────────────────────

fn build_http(options: &ClientOptions) -> Result<reqwest::blocking::Client, SheetsError> {
    reqwest::blocking::Client::builder()
        .user_agent(options.user_agent.as_str())
        .timeout(Duration::from_secs(options.timeout_secs))
        .build()
        .map_err(|e| SheetsError::Authentication(format!("unable to build HTTP client: {}", e)))
}

fn check_status(
    response: reqwest::blocking::Response,
    context: &str,
) -> Result<reqwest::blocking::Response, SheetsError> {
    let status = response.status().as_u16();
    if !response.status().is_success() {
        let body = response.text().unwrap_or_default();
        return Err(SheetsError::remote(
            context,
            RemoteFailure::Http(status, extract_google_error(&body, status)),
        ));
    }
    Ok(response)
}

fn parse_json<T: DeserializeOwned>(
    response: reqwest::blocking::Response,
    context: &str,
) -> Result<T, SheetsError> {
    response
        .json()
        .map_err(|e| SheetsError::remote(context, RemoteFailure::Parse(e.to_string())))
}
