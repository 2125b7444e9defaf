// Zabbix JSON-RPC HTTP client
//
// Wraps `reqwest::Client` with request-id allocation, session-token
// injection and envelope unwrapping. Endpoint methods (login, hosts,
// reference data) are implemented as inherent methods in separate files
// to keep this module focused on transport mechanics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::{RpcRequest, RpcResponse};
use crate::transport::TransportConfig;

const JSONRPC_VERSION: &str = "2.0";
const BODY_PREVIEW: usize = 200;

/// Raw HTTP client for the Zabbix `api_jsonrpc.php` endpoint.
///
/// Every call is a single synchronous request/response exchange. The
/// session token obtained by [`login`](Self::login) is held in memory and
/// attached as the `auth` member of every subsequent request.
pub struct ZabbixClient {
    http: reqwest::Client,
    endpoint: Url,
    session: RwLock<Option<SecretString>>,
    next_id: AtomicU64,
}

impl ZabbixClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `endpoint` is the full JSON-RPC URL, e.g.
    /// `https://monitor.example.com/zabbix/api_jsonrpc.php`.
    pub fn new(endpoint: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, endpoint))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, endpoint: Url) -> Self {
        Self {
            http,
            endpoint,
            session: RwLock::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Whether a session token is currently held.
    pub fn is_authenticated(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    // ── Session token management ─────────────────────────────────────

    /// Install a session token (e.g. one obtained out of band).
    pub fn set_session(&self, token: SecretString) {
        debug!("storing session token");
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Drop the held session token, returning it.
    pub(crate) fn take_session(&self) -> Option<SecretString> {
        self.session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub(crate) fn session_secret(&self) -> Option<SecretString> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Call an authenticated method and deserialize its `result`.
    pub(crate) async fn call<T, P>(&self, method: &str, params: &P) -> Result<T, Error>
    where
        T: DeserializeOwned,
        P: Serialize + Sync,
    {
        let token = self.session_secret().ok_or(Error::NotAuthenticated)?;
        self.send(method, params, Some(token.expose_secret())).await
    }

    /// Call a method that does not take the `auth` member (`user.login`).
    pub(crate) async fn call_anonymous<T, P>(&self, method: &str, params: &P) -> Result<T, Error>
    where
        T: DeserializeOwned,
        P: Serialize + Sync,
    {
        self.send(method, params, None).await
    }

    async fn send<T, P>(&self, method: &str, params: &P, auth: Option<&str>) -> Result<T, Error>
    where
        T: DeserializeOwned,
        P: Serialize + Sync,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            id,
            auth,
        };

        debug!(method, id, "POST {}", self.endpoint);

        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_envelope(resp).await
    }
}

/// Parse the JSON-RPC envelope, returning `result` on success or
/// `Error::Rpc` when the response carries an `error` member.
async fn parse_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Http {
            status: status.as_u16(),
            body: preview(&body).to_owned(),
        });
    }

    let body = resp.text().await.map_err(Error::Transport)?;
    trace!(len = body.len(), "response body received");

    let envelope: RpcResponse = serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body: body.clone(),
    })?;

    if let Some(err) = envelope.error {
        return Err(Error::Rpc {
            code: err.code,
            message: err.message,
            data: err.data.unwrap_or_default(),
        });
    }

    let result = envelope.result.ok_or_else(|| Error::Deserialization {
        message: "response has neither `result` nor `error`".into(),
        body: body.clone(),
    })?;

    serde_json::from_value(result).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(BODY_PREVIEW);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
