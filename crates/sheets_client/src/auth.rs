//! Service-account authentication.
//!
//! Parses a Google service-account JSON key, signs an RS256 JWT assertion
//! with its private key and exchanges it at the key's `token_uri` for a
//! bearer token. Tokens are cached and re-exchanged shortly before expiry.
//!
//! Credentials can also be located on disk: explicit path, then
//! `GOOGLE_APPLICATION_CREDENTIALS`, then ~/.config/sheetbridge/service_account.json.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ring::signature::RsaKeyPair;
use serde::{Deserialize, Serialize};

use crate::error::{extract_google_error, RemoteFailure, SheetsError};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const CREDENTIALS_ENV_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Re-exchange when fewer than this many seconds of validity remain.
const REFRESH_MARGIN_SECS: i64 = 60;
const REFRESH_CONTEXT: &str = "unable to refresh access token";

#[derive(Debug, Deserialize)]
struct ServiceAccountJson {
    #[serde(rename = "type", default)]
    key_type: String,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    private_key: String,
    #[serde(default)]
    client_email: String,
    #[serde(default)]
    token_uri: Option<String>,
}

/// A parsed service-account key with its RSA signing key loaded.
pub struct ServiceAccountKey {
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
    pub client_email: String,
    pub token_uri: String,
    key_pair: RsaKeyPair,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct JwtHeader<'a> {
    alg: &'static str,
    typ: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// A bearer token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub(crate) struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

impl ServiceAccountKey {
    /// Parse a service-account JSON key.
    ///
    /// Fails if the payload is not JSON, is not a `service_account` key, or
    /// its private key is not a usable RSA key.
    pub fn from_json(credentials: &[u8]) -> Result<Self, SheetsError> {
        if credentials.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(SheetsError::Authentication("credentials are empty".into()));
        }

        let raw: ServiceAccountJson = serde_json::from_slice(credentials).map_err(|e| {
            SheetsError::Authentication(format!("invalid service account key: {}", e))
        })?;

        if raw.key_type != "service_account" {
            return Err(SheetsError::Authentication(format!(
                "'type' field is {:?} (expected \"service_account\")",
                raw.key_type,
            )));
        }
        if raw.client_email.is_empty() {
            return Err(SheetsError::Authentication("missing client_email".into()));
        }

        let key_pair = parse_rsa_key(&raw.private_key).map_err(SheetsError::Authentication)?;

        Ok(Self {
            project_id: raw.project_id,
            private_key_id: raw.private_key_id.filter(|id| !id.is_empty()),
            client_email: raw.client_email,
            token_uri: raw
                .token_uri
                .filter(|uri| !uri.is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            key_pair,
        })
    }

    /// Build the signed JWT assertion for `scope`, audience `aud`, issued at `now`.
    pub(crate) fn sign_assertion(
        &self,
        scope: &str,
        aud: &str,
        now: DateTime<Utc>,
    ) -> Result<String, String> {
        let iat = now.timestamp();
        let header = JwtHeader {
            alg: "RS256",
            typ: "JWT",
            kid: self.private_key_id.as_deref(),
        };
        let claims = JwtClaims {
            iss: &self.client_email,
            scope,
            aud,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let header_b64 = BASE64_URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&header).map_err(|e| format!("failed to encode JWT header: {}", e))?,
        );
        let claims_b64 = BASE64_URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&claims).map_err(|e| format!("failed to encode JWT claims: {}", e))?,
        );
        let signing_input = format!("{}.{}", header_b64, claims_b64);

        let mut signature = vec![0; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(
                &ring::signature::RSA_PKCS1_SHA256,
                &ring::rand::SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|_| "failed to sign JWT assertion".to_string())?;

        Ok(format!("{}.{}", signing_input, BASE64_URL_SAFE_NO_PAD.encode(&signature)))
    }

    /// Exchange a freshly signed assertion for an access token.
    pub(crate) fn fetch_access_token(
        &self,
        http: &reqwest::blocking::Client,
        token_uri: &str,
        scope: &str,
    ) -> Result<AccessToken, TokenError> {
        let now = Utc::now();
        let assertion = self
            .sign_assertion(scope, token_uri, now)
            .map_err(TokenError::Signing)?;

        log::debug!("exchanging JWT assertion for {} at {}", self.client_email, token_uri);

        let response = http
            .post(token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(|e| TokenError::Remote(RemoteFailure::Network(e.to_string())))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TokenError::Remote(RemoteFailure::Http(
                status,
                extract_google_error(&body, status),
            )));
        }

        let body: TokenResponse = response
            .json()
            .map_err(|e| TokenError::Remote(RemoteFailure::Parse(e.to_string())))?;
        if body.access_token.is_empty() {
            return Err(TokenError::Remote(RemoteFailure::Parse(
                "token response has an empty access_token".into(),
            )));
        }

        let lifetime = body.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        Ok(AccessToken {
            token: body.access_token,
            expires_at: now + Duration::seconds(lifetime),
        })
    }
}

fn parse_rsa_key(pem: &str) -> Result<RsaKeyPair, String> {
    let mut reader = std::io::Cursor::new(pem.as_bytes());
    let item = rustls_pemfile::read_one(&mut reader)
        .map_err(|e| format!("invalid PEM private key: {}", e))?;

    match item {
        Some(rustls_pemfile::Item::Pkcs8Key(der)) => RsaKeyPair::from_pkcs8(der.secret_pkcs8_der())
            .map_err(|e| format!("unusable pkcs8 private key: {}", e)),
        Some(rustls_pemfile::Item::Pkcs1Key(der)) => RsaKeyPair::from_der(der.secret_pkcs1_der())
            .map_err(|e| format!("unusable pkcs1 private key: {}", e)),
        Some(_) => Err("private key is not an RSA key".into()),
        None => Err("missing private key".into()),
    }
}

/// Failure while obtaining a token; callers decide which `SheetsError` it becomes.
#[derive(Debug)]
pub(crate) enum TokenError {
    Signing(String),
    Remote(RemoteFailure),
}

/// Where the client's bearer token comes from.
pub(crate) enum TokenSource {
    /// Pre-issued token, used as-is for the client's lifetime
    Static(String),
    ServiceAccount {
        key: Box<ServiceAccountKey>,
        token_uri: String,
        scope: String,
        cached: RefCell<AccessToken>,
    },
}

impl TokenSource {
    /// Perform the initial exchange. Any failure here is an authentication error.
    pub(crate) fn service_account(
        key: ServiceAccountKey,
        token_uri: Option<&str>,
        scope: &str,
        http: &reqwest::blocking::Client,
    ) -> Result<Self, SheetsError> {
        let token_uri = token_uri.unwrap_or(&key.token_uri).to_string();
        let token = key.fetch_access_token(http, &token_uri, scope).map_err(|e| match e {
            TokenError::Signing(msg) => SheetsError::Authentication(msg),
            TokenError::Remote(failure) => {
                SheetsError::Authentication(format!("unable to obtain access token: {}", failure))
            }
        })?;

        Ok(Self::ServiceAccount {
            key: Box::new(key),
            token_uri,
            scope: scope.to_string(),
            cached: RefCell::new(token),
        })
    }

    /// Current bearer token, re-exchanged first if it is about to expire.
    pub(crate) fn bearer(&self, http: &reqwest::blocking::Client) -> Result<String, SheetsError> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::ServiceAccount { key, token_uri, scope, cached } => {
                if cached.borrow().is_fresh(Utc::now()) {
                    return Ok(cached.borrow().token.clone());
                }

                log::debug!("access token for {} expired, refreshing", key.client_email);
                let token = key
                    .fetch_access_token(http, token_uri, scope)
                    .map_err(refresh_error)?;
                let bearer = token.token.clone();
                *cached.borrow_mut() = token;
                Ok(bearer)
            }
        }
    }
}

/// Mid-session refresh failures are remote errors; the key itself was
/// already accepted at construction.
fn refresh_error(e: TokenError) -> SheetsError {
    let failure = match e {
        TokenError::Signing(msg) => RemoteFailure::Parse(msg),
        TokenError::Remote(failure) => failure,
    };
    SheetsError::remote(REFRESH_CONTEXT, failure)
}

/// Default on-disk location of the service-account key.
pub fn default_credentials_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("sheetbridge/service_account.json"))
}

/// Resolve the credentials file: explicit path > env var > default path (if it exists).
pub fn resolve_credentials_path(explicit: Option<PathBuf>) -> Result<PathBuf, SheetsError> {
    resolve_from(
        explicit,
        std::env::var(CREDENTIALS_ENV_VAR).ok(),
        default_credentials_path(),
    )
}

fn resolve_from(
    explicit: Option<PathBuf>,
    env_value: Option<String>,
    default: Option<PathBuf>,
) -> Result<PathBuf, SheetsError> {
    if let Some(path) = explicit {
        if path.as_os_str().is_empty() {
            return Err(SheetsError::Configuration("credentials path is empty".into()));
        }
        return Ok(path);
    }

    if let Some(value) = env_value {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    if let Some(path) = default.filter(|p| p.exists()) {
        return Ok(path);
    }

    Err(SheetsError::Configuration(format!(
        "no service account credentials found (pass a path or set {})",
        CREDENTIALS_ENV_VAR,
    )))
}

/// Read a credentials file into memory.
pub fn read_credentials(path: &Path) -> Result<Vec<u8>, SheetsError> {
    std::fs::read(path).map_err(|e| {
        SheetsError::Configuration(format!(
            "unable to read credentials file {}: {}",
            path.display(),
            e,
        ))
    })
}
