// Remote collection HTTP client
//
// Wraps `reqwest::Client` with collection URL construction, offset/limit
// query parameters, and envelope decoding. Bodies are read as text first
// so decode failures can carry the raw payload.

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::Page;

/// HTTP client for a remote record collection API.
///
/// Paths are collection names relative to the base URL (`"tracks"`,
/// `"playlists/42/items"`). All methods return decoded payloads -- the
/// paging envelope is handled here, never by callers.
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RemoteClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// Use this when the embedding application already configured a client
    /// (auth middleware, cookie jar, test harness).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
        })
    }

    /// The collection API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for a collection path: `{base}/{path}`.
    fn collection_url(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&full)?)
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Fetch one page of a collection.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Page<T>, Error> {
        let mut url = self.collection_url(path)?;
        url.query_pairs_mut()
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string());

        debug!("GET {url}");
        let resp = self.http.get(url).send().await?;
        parse_body(resp).await
    }

    /// Fetch a whole collection as raw JSON.
    ///
    /// Used for import flows where decoding into domain records happens
    /// on the consuming side.
    pub async fn get_collection(&self, path: &str) -> Result<serde_json::Value, Error> {
        let url = self.collection_url(path)?;

        debug!("GET {url}");
        let resp = self.http.get(url).send().await?;
        parse_body(resp).await
    }
}

/// Read the response body and decode it, mapping non-success statuses to
/// `Error::Api` with the body as the message.
async fn parse_body<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(Error::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}
