// Client configuration
// Either built in code or deserialized from a JSON document embedded in the
// caller's own settings.

use serde::{Deserialize, Serialize};

use crate::error::SheetsError;

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for a [`crate::SheetsClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Sheets API base URL (overridden in tests to point at a mock server)
    pub api_base: String,

    /// OAuth scope requested for the access token
    pub scope: String,

    /// Per-request timeout
    pub timeout_secs: u64,

    pub user_agent: String,

    /// Replaces the `token_uri` from the service-account key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,

    /// Initial spreadsheet target (empty = unset)
    pub spreadsheet_id: String,

    /// Initial sheet target (empty = unset)
    pub sheet_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            scope: SPREADSHEETS_SCOPE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("sheetbridge/{}", env!("CARGO_PKG_VERSION")),
            token_uri: None,
            spreadsheet_id: String::new(),
            sheet_name: String::new(),
        }
    }
}

impl ClientOptions {
    /// Parse options from JSON. Missing keys take their defaults.
    pub fn from_json(input: &str) -> Result<Self, SheetsError> {
        serde_json::from_str(input)
            .map_err(|e| SheetsError::Configuration(format!("invalid client options: {}", e)))
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = Some(token_uri.into());
        self
    }

    pub fn with_target(mut self, spreadsheet_id: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        self.spreadsheet_id = spreadsheet_id.into();
        self.sheet_name = sheet_name.into();
        self
    }

    pub(crate) fn api_base_trimmed(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }
}
