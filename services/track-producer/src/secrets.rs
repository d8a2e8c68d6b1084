//!
//! src/secrets.rs  Andrew Belles  Oct 2nd, 2025
//!
//! Secret store lookup. Secrets are fetched through the local parameters
//! and secrets extension, which fronts the managed secret store over http
//!

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::{HttpConfig, SecretsConfig};
use crate::fetch::client_helper;
use crate::ProducerError;

const SECRETS_TOKEN_HEADER: &str = "X-Aws-Parameters-Secrets-Token";

/// Every field of a stored secret, values as stored
pub type Secret = Map<String, Value>;

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Returns every field of the named secret
    async fn get_secrets(&self, name: &str) ->
        Result<Secret, ProducerError>;
}

/// Body returned by GET /secretsmanager/get
#[derive(Debug, Deserialize)]
struct SecretValue {
    #[serde(rename = "SecretString")]
    secret_string: Option<String>
}

/// Secret strings are json objects; field values may be of any json type
pub fn parse_secret_string(raw: &str) -> Result<Secret, ProducerError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(ProducerError::Credential(
            format!("malformed secret: expected a json object, found {}", json_kind(&other))
        )),
        Err(e) => Err(ProducerError::Credential(format!("malformed secret: {e}")))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null      => "null",
        Value::Bool(_)   => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_)  => "an array",
        Value::Object(_) => "an object"
    }
}

/// Pulls a required string field out of a fetched secret
pub fn require_field(secret: &Secret, field: &str) -> Result<String, ProducerError> {
    match secret.get(field) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(ProducerError::Credential(
            format!("secret field {field} is {}, expected a string", json_kind(other))
        )),
        None => Err(ProducerError::Credential(format!("secret missing field {field}")))
    }
}

#[derive(Clone, Debug)]
pub struct ExtensionSecretStore {
    http: Client,
    cfg: SecretsConfig
}

impl ExtensionSecretStore {
    pub fn new(http_config: &HttpConfig, cfg: &SecretsConfig) ->
        Result<Self, ProducerError> {
        let http = client_helper(http_config)
            .build()
            .map_err(|e| ProducerError::Config(format!("build secrets client: {e}")))?;
        Ok( Self { http, cfg: cfg.clone() } )
    }

    /// GET /secretsmanager/get?secretId=...
    fn secret_request(&self, name: &str) -> Result<reqwest::RequestBuilder, ProducerError> {
        let url = self.cfg.endpoint.join("secretsmanager/get")
            .map_err(|e| ProducerError::Config(format!("secrets url: {e}")))?;
        let mut request = self.http.get(url)
            .header(header::ACCEPT, "application/json")
            .query(&[("secretId", name)]);
        if let Some(token) = &self.cfg.session_token {
            request = request.header(SECRETS_TOKEN_HEADER, token);
        }
        Ok(request)
    }
}

#[async_trait]
impl SecretStore for ExtensionSecretStore {
    async fn get_secrets(&self, name: &str) -> Result<Secret, ProducerError> {
        let response = self.secret_request(name)?
            .send()
            .await
            .map_err(|e| ProducerError::Credential(format!("secret store unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProducerError::Credential(
                format!("secret {name} lookup failed ({status}): {body}")
            ));
        }

        let value: SecretValue = response.json()
            .await
            .map_err(|e| ProducerError::Credential(format!("secret response: {e}")))?;
        let raw = value.secret_string
            .ok_or_else(|| ProducerError::Credential(
                format!("secret {name} has no SecretString")
            ))?;

        parse_secret_string(&raw)
    }
}
