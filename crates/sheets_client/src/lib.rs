//! Google Sheets client over a service account.
//!
//! One client targets one spreadsheet and one sheet (tab) at a time; the
//! target is mutable session state. Operations read a range, append rows,
//! insert rows at a position and delete the first row matching a value.
//!
//! Blocking. No retries. No caching of sheet ids between calls.

mod auth;
mod client;
mod error;
mod options;
mod values;

pub use auth::{
    ServiceAccountKey, CREDENTIALS_ENV_VAR, DEFAULT_TOKEN_URI,
    default_credentials_path, read_credentials, resolve_credentials_path,
};
pub use client::{SheetProperties, SheetsClient};
pub use error::{RemoteFailure, SheetsError};
pub use options::{ClientOptions, DEFAULT_API_BASE, DEFAULT_TIMEOUT_SECS, SPREADSHEETS_SCOPE};
pub use values::{CellValue, Row, column_index, data_to_string, find_row_number};
