//!
//! src/fetch.rs  Andrew Belles  Oct 2nd, 2025
//!
//! Defines methods for hitting the catalog endpoints: client credentials
//! token exchange and the track search the producer runs once per call
//!

use async_trait::async_trait;
use reqwest::{Client, header, redirect};
use serde::Deserialize;
use tracing::debug;

use crate::config::{HttpConfig, SpotifyConfig};
use crate::types::{CatalogTrack, SearchResponse};
use crate::ProducerError;

/// Client building functionality
pub fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder  {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

fn client_with_headers(http: &HttpConfig, headers: header::HeaderMap) ->
    Result<Client, ProducerError> {
    client_helper(http)
        .default_headers(headers)
        .build()
        .map_err(|e| ProducerError::Config(format!("build client: {e}")))
}

pub fn base_client(http: &HttpConfig) -> Result<Client, ProducerError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    client_with_headers(http, h)
}

/// Client id/secret pair read from the secret store
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Track search as the producer needs it
#[async_trait]
pub trait TrackCatalog: Send + Sync {
    async fn search_tracks(
        &self,
        credentials: &ClientCredentials,
        query: &str,
        limit: u32
    ) -> Result<Vec<CatalogTrack>, ProducerError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String
}

#[derive(Clone, Debug)]
pub struct SpotifyClient {
    pub http: Client,
    pub cfg: SpotifyConfig
}

impl SpotifyClient {
    pub fn new(http_config: &HttpConfig, cfg: &SpotifyConfig) ->
        Result<Self, ProducerError> {

        let http = base_client(http_config)?;
        Ok( Self {
            http,
            cfg: cfg.clone()
        })
    }

    pub fn token_request(&self) -> reqwest::RequestBuilder {
        self.http
            .post(self.cfg.token_url.clone())
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
    }

    /// GET /v1/search?type=track&q=...&limit=&offset=
    pub fn search(&self, query: &str, limit: u32, offset: u32, bearer: &str) ->
        Result<reqwest::RequestBuilder, ProducerError> {
        let url = self.cfg.api_base.join("search")
            .map_err(|e| ProducerError::Config(format!("search url: {e}")))?;
        Ok( self.http.get(url).bearer_auth(bearer).query(&[
            ("type", "track"),
            ("q", query),
            ("limit", &limit.to_string()),
            ("offset", &offset.to_string())
        ]))
    }

    pub async fn access_token(&self, credentials: &ClientCredentials) ->
        Result<String, ProducerError> {
        let response = self.token_request()
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .send()
            .await?
            .error_for_status()?;

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl TrackCatalog for SpotifyClient {
    async fn search_tracks(
        &self,
        credentials: &ClientCredentials,
        query: &str,
        limit: u32
    ) -> Result<Vec<CatalogTrack>, ProducerError> {
        let bearer = self.access_token(credentials).await?;

        let response = self.search(query, limit, 0, &bearer)?
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        let page: SearchResponse = serde_json::from_str(&body)?;
        debug!(items = page.tracks.items.len(), total = ?page.tracks.total, "catalog.search");

        Ok(page.tracks.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SpotifyClient {
        let cfg = SpotifyConfig {
            token_url: url::Url::parse("https://accounts.spotify.com/api/token").unwrap(),
            api_base: url::Url::parse("https://api.spotify.com/v1/").unwrap()
        };
        SpotifyClient::new(&HttpConfig::default(), &cfg).unwrap()
    }

    #[test]
    fn search_request_shape() {
        let request = client().search("all", 50, 0, "bearer").unwrap().build().unwrap();

        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(request.url().path(), "/v1/search");
        assert_eq!(request.url().query(), Some("type=track&q=all&limit=50&offset=0"));
        assert_eq!(request.headers()[header::AUTHORIZATION], "Bearer bearer");
    }

    #[test]
    fn token_request_is_client_credentials_grant() {
        let request = client().token_request()
            .basic_auth("id", Some("secret"))
            .build()
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().host_str(), Some("accounts.spotify.com"));
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, b"grant_type=client_credentials");
        assert!(request.headers().contains_key(header::AUTHORIZATION));
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let credentials = ClientCredentials {
            client_id: "id".to_string(),
            client_secret: "hunter2".to_string()
        };
        let shown = format!("{credentials:?}");
        assert!(shown.contains("id"));
        assert!(!shown.contains("hunter2"));
    }
}
