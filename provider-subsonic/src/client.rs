//! Subsonic REST client
//!
//! Every method is a GET to `{server}/rest/{method}` carrying the common
//! parameters (`u`, `v`, `c`, `f`) plus credentials. In token mode each
//! request gets a fresh salt and sends `t = md5(password + salt)`; legacy
//! mode sends the password itself as `p`.
//!
//! Retries happen here rather than in the transport: every attempt is signed
//! again, and methods that change server state are sent once.

use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use core_runtime::logging::redact_url;
use md5::{Digest, Md5};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{Result, SubsonicError};
use crate::types::{Envelope, ResponseStatus, SubsonicApiError, SubsonicResponse};

/// Protocol version sent as `v`
pub const PROTOCOL_VERSION: &str = "1.16.1";

/// Length of the per-request salt
pub const SALT_LENGTH: usize = 24;

const SALT_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Largest multiple of the alphabet size that fits in a byte; bytes at or
/// above it are discarded so every character is equally likely.
const SALT_REJECTION_BOUND: u8 = 248;

/// Methods that change server state. A failed attempt may already have been
/// applied, so they are never repeated.
const MUTATING_METHODS: &[&str] = &["createPlaylist", "updatePlaylist", "deletePlaylist"];

/// A method parameter. `None` values are left out of the request and keys
/// may repeat.
pub type Param = (&'static str, Option<String>);

/// How credentials are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// `t` and `s` (Subsonic 1.13+)
    #[default]
    Token,
    /// Plain `p`, for servers without token support
    Legacy,
}

/// Classified outcome of a method call that produced a response.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResult<T> {
    Success(T),
    /// Non-2xx HTTP status
    HttpError(u16),
    /// `status=failed`, with the server's error when it sent one
    ProtocolError(Option<SubsonicApiError>),
}

/// Random salt of [`SALT_LENGTH`] alphanumeric characters from the OS RNG.
pub fn generate_salt() -> Result<String> {
    let mut salt = String::with_capacity(SALT_LENGTH);
    let mut buffer = [0u8; 64];

    while salt.len() < SALT_LENGTH {
        getrandom::getrandom(&mut buffer).map_err(|e| SubsonicError::Salt(e.to_string()))?;
        for byte in buffer {
            if byte < SALT_REJECTION_BOUND {
                salt.push(SALT_ALPHABET[(byte % 62) as usize] as char);
                if salt.len() == SALT_LENGTH {
                    break;
                }
            }
        }
    }

    Ok(salt)
}

/// Lowercase hex `md5(password + salt)`.
pub fn token(password: &str, salt: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct SubsonicClient {
    http_client: Arc<dyn HttpClient>,
    server: Url,
    username: String,
    password: String,
    auth_mode: AuthMode,
    client_name: String,
    retry: RetryPolicy,
}

impl SubsonicClient {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        server: Url,
        username: impl Into<String>,
        password: impl Into<String>,
        auth_mode: AuthMode,
        client_name: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            server,
            username: username.into(),
            password: password.into(),
            auth_mode,
            client_name: client_name.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the policy for read-only methods.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    /// Signed URL for `method` without executing it (`stream`, `getCoverArt`).
    pub fn method_url(&self, method: &str, params: &[Param]) -> Result<Url> {
        let base = self.server.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{}/rest/{}", base, method))
            .map_err(|e| SubsonicError::InvalidUrl(format!("{}: {}", self.server, e)))?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("u", &self.username)
                .append_pair("v", PROTOCOL_VERSION)
                .append_pair("c", &self.client_name)
                .append_pair("f", "json");

            match self.auth_mode {
                AuthMode::Legacy => {
                    query.append_pair("p", &self.password);
                }
                AuthMode::Token => {
                    let salt = generate_salt()?;
                    query
                        .append_pair("t", &token(&self.password, &salt))
                        .append_pair("s", &salt);
                }
            }

            for (key, value) in params {
                if let Some(value) = value {
                    query.append_pair(key, value);
                }
            }
        }

        Ok(url)
    }

    /// Call `method` and extract its result with `projection`.
    ///
    /// Transport failures and undecodable bodies are errors; so is a
    /// successful response for which `projection` finds nothing.
    #[instrument(skip(self, projection, params), fields(server = %self.server))]
    pub async fn call<T, F>(&self, method: &str, projection: F, params: &[Param]) -> Result<MethodResult<T>>
    where
        F: FnOnce(SubsonicResponse) -> Option<T>,
    {
        let response = self.send(method, params).await?;

        if !response.is_success() {
            warn!(method, status = response.status, "Subsonic request failed");
            return Ok(MethodResult::HttpError(response.status));
        }

        let envelope: Envelope =
            serde_json::from_slice(&response.body).map_err(|e| SubsonicError::Decode {
                method: method.to_string(),
                message: e.to_string(),
            })?;
        let body = envelope.response;

        match body.status {
            ResponseStatus::Failed => {
                warn!(method, error = ?body.error, "Subsonic method failed");
                Ok(MethodResult::ProtocolError(body.error))
            }
            ResponseStatus::Ok => projection(body)
                .map(MethodResult::Success)
                .ok_or_else(|| SubsonicError::MissingResult {
                    method: method.to_string(),
                }),
        }
    }

    /// Execute `method`, retrying transient failures of read-only methods.
    ///
    /// The transport is asked for exactly one attempt per request so that a
    /// signed URL never goes over the wire twice.
    async fn send(&self, method: &str, params: &[Param]) -> Result<HttpResponse> {
        let max_attempts = if MUTATING_METHODS.contains(&method) {
            1
        } else {
            self.retry.max_attempts.max(1)
        };
        let mut attempt = 0;

        loop {
            attempt += 1;
            let last_attempt = attempt >= max_attempts;

            let url = self.method_url(method, params)?;
            debug!(attempt, url = %redact_url(url.as_str()), "Calling Subsonic method");
            let request = HttpRequest::get(url.as_str()).accept("application/json");

            match self
                .http_client
                .execute_with_retry(request, RetryPolicy::none())
                .await
            {
                Ok(response) if response.is_retryable() && !last_attempt => {
                    warn!(method, status = response.status, attempt, "Retrying Subsonic request");
                }
                Err(e) if e.is_transient() && !last_attempt => {
                    warn!(method, error = %e, attempt, "Retrying Subsonic request");
                }
                outcome => return Ok(outcome?),
            }

            tokio::time::sleep(self.retry.delay_for(attempt)).await;
        }
    }

    /// `ping`: checks reachability and credentials.
    pub async fn ping(&self) -> Result<MethodResult<()>> {
        self.call("ping", |_| Some(()), &[]).await
    }
}

impl fmt::Debug for SubsonicClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubsonicClient")
            .field("server", &self.server.as_str())
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("auth_mode", &self.auth_mode)
            .field("client_name", &self.client_name)
            .field("max_attempts", &self.retry.max_attempts)
            .finish()
    }
}
