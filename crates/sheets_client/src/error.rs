use std::fmt;

/// Error type for every client operation.
#[derive(Debug)]
pub enum SheetsError {
    /// Spreadsheet id or sheet name unset, or a required argument is empty.
    /// Raised before any request is sent.
    Configuration(String),
    /// A named sheet does not exist, or no row matched a filter.
    NotFound(String),
    /// The Sheets API (or the token endpoint, after construction) rejected
    /// or failed a request.
    Remote { context: String, failure: RemoteFailure },
    /// Credentials could not be parsed or exchanged for an access token.
    /// Only produced while constructing a client.
    Authentication(String),
}

/// Underlying cause of a [`SheetsError::Remote`].
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteFailure {
    /// Transport error (connect, TLS, timeout)
    Network(String),
    /// Non-2xx status with the message extracted from the response body
    Http(u16, String),
    /// Response body did not have the expected shape
    Parse(String),
}

impl SheetsError {
    pub(crate) fn remote(context: impl Into<String>, failure: RemoteFailure) -> Self {
        Self::Remote { context: context.into(), failure }
    }

    /// HTTP status of a remote failure, if the API answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { failure: RemoteFailure::Http(code, _), .. } => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Http(code, msg) => write!(f, "HTTP {code}: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for RemoteFailure {}

impl fmt::Display for SheetsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Remote { context, failure } => write!(f, "{context}: {failure}"),
            Self::Authentication(msg) => write!(f, "authentication error: {msg}"),
        }
    }
}

impl std::error::Error for SheetsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Remote { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

/// Pull a human-readable message out of a Google API error body.
///
/// Google wraps errors as `{"error": {"code": 400, "message": "...", "status": "..."}}`.
/// The OAuth token endpoint uses `{"error": "...", "error_description": "..."}` instead.
pub(crate) fn extract_google_error(body: &str, status: u16) -> String {
    let json: serde_json::Value = serde_json::from_str(body).unwrap_or(serde_json::Value::Null);

    if let Some(msg) = json["error"]["message"].as_str() {
        return msg.to_string();
    }
    if let Some(desc) = json["error_description"].as_str() {
        return desc.to_string();
    }
    if let Some(code) = json["error"].as_str() {
        return code.to_string();
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status)
    } else {
        trimmed.chars().take(200).collect()
    }
}
