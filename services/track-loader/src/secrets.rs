//!
//! src/secrets.rs  Andrew Belles  Oct 3rd, 2025
//!
//! Secret store lookup for the warehouse login, through the local
//! parameters and secrets extension
//!

use async_trait::async_trait;
use reqwest::{Client, header, redirect};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::{HttpConfig, SecretsConfig};
use crate::LoaderError;

const SECRETS_TOKEN_HEADER: &str = "X-Aws-Parameters-Secrets-Token";

/// Every field of a stored secret, values as stored. Warehouse secrets
/// carry non-string fields such as a numeric `port`
pub type Secret = Map<String, Value>;

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Returns every field of the named secret
    async fn get_secrets(&self, name: &str) ->
        Result<Secret, LoaderError>;
}

/// Warehouse login held in the secret as `username` / `password`
#[derive(Clone)]
pub struct WarehouseCredentials {
    pub username: String,
    pub password: String
}

impl std::fmt::Debug for WarehouseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl WarehouseCredentials {
    pub fn from_secret(secret: &Secret) -> Result<Self, LoaderError> {
        let field = |name: &str| match secret.get(name) {
            Some(value) => value.as_str()
                .map(str::to_string)
                .ok_or_else(|| LoaderError::Credential(
                    format!("secret field {name} is not a string")
                )),
            None => Err(LoaderError::Credential(format!("secret missing field {name}")))
        };
        Ok( Self { username: field("username")?, password: field("password")? } )
    }
}

/// Body returned by GET /secretsmanager/get
#[derive(Debug, Deserialize)]
struct SecretValue {
    #[serde(rename = "SecretString")]
    secret_string: Option<String>
}

/// Secret strings are json objects; anything else is rejected
pub fn parse_secret_string(raw: &str) -> Result<Secret, LoaderError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(LoaderError::Credential("malformed secret: not a json object".to_string())),
        Err(e) => Err(LoaderError::Credential(format!("malformed secret: {e}")))
    }
}

#[derive(Clone, Debug)]
pub struct ExtensionSecretStore {
    http: Client,
    cfg: SecretsConfig
}

impl ExtensionSecretStore {
    pub fn new(http: &HttpConfig, cfg: &SecretsConfig) -> Result<Self, LoaderError> {
        let http = Client::builder()
            .timeout(http.timeout)
            .connect_timeout(http.connect_timeout)
            .pool_max_idle_per_host(http.pool_max_idle_per_host)
            .pool_idle_timeout(Some(http.pool_idle_timeout))
            .redirect(redirect::Policy::limited(http.max_redirects as usize))
            .build()
            .map_err(|e| LoaderError::Config(format!("build secrets client: {e}")))?;
        Ok( Self { http, cfg: cfg.clone() } )
    }

    /// GET /secretsmanager/get?secretId=...
    fn secret_request(&self, name: &str) -> Result<reqwest::RequestBuilder, LoaderError> {
        let url = self.cfg.endpoint.join("secretsmanager/get")
            .map_err(|e| LoaderError::Config(format!("secrets url: {e}")))?;
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
    async fn get_secrets(&self, name: &str) -> Result<Secret, LoaderError> {
        let response = self.secret_request(name)?
            .send()
            .await
            .map_err(|e| LoaderError::Credential(format!("secret store unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LoaderError::Credential(
                format!("secret {name} lookup failed ({status}): {body}")
            ));
        }

        let value: SecretValue = response.json()
            .await
            .map_err(|e| LoaderError::Credential(format!("secret response: {e}")))?;
        let raw = value.secret_string
            .ok_or_else(|| LoaderError::Credential(
                format!("secret {name} has no SecretString")
            ))?;

        parse_secret_string(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_keys_match_stored_object() {
        let secret = parse_secret_string(
            r#"{"username":"loader","password":"pw","engine":"redshift"}"#
        ).unwrap();

        let mut keys: Vec<_> = secret.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, ["engine", "password", "username"]);
    }

    #[test]
    fn credentials_from_secret() {
        let secret = parse_secret_string(r#"{"username":"loader","password":"pw"}"#).unwrap();
        let creds = WarehouseCredentials::from_secret(&secret).unwrap();
        assert_eq!(creds.username, "loader");
        assert_eq!(creds.password, "pw");
        assert!(!format!("{creds:?}").contains("pw\""));
    }

    #[test]
    fn incomplete_or_malformed_secret_is_credential_error() {
        let secret = parse_secret_string(r#"{"username":"loader"}"#).unwrap();
        assert!(matches!(
            WarehouseCredentials::from_secret(&secret),
            Err(LoaderError::Credential(_))
        ));
        assert!(matches!(parse_secret_string("{"), Err(LoaderError::Credential(_))));
        assert!(matches!(parse_secret_string("[\"loader\"]"), Err(LoaderError::Credential(_))));
    }

    #[test]
    fn warehouse_secret_with_numeric_port_is_accepted() {
        let secret = parse_secret_string(r#"{
            "username": "admin",
            "password": "pw",
            "engine": "redshift",
            "host": "wg.example",
            "port": 5439,
            "dbname": "dev"
        }"#).unwrap();

        let mut keys: Vec<_> = secret.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, ["dbname", "engine", "host", "password", "port", "username"]);
        assert_eq!(secret["port"], 5439);

        let creds = WarehouseCredentials::from_secret(&secret).unwrap();
        assert_eq!(creds.username, "admin");
    }

    #[test]
    fn non_string_login_field_is_credential_error() {
        let secret = parse_secret_string(r#"{"username":"admin","password":1234}"#).unwrap();
        match WarehouseCredentials::from_secret(&secret) {
            Err(LoaderError::Credential(msg)) => assert!(msg.contains("password")),
            other => panic!("expected credential error, got {other:?}")
        }
    }

    #[test]
    fn request_targets_extension() {
        let cfg = SecretsConfig {
            endpoint: url::Url::parse("http://localhost:2773/").unwrap(),
            session_token: None
        };
        let store = ExtensionSecretStore::new(&HttpConfig::default(), &cfg).unwrap();
        let request = store.secret_request("warehouse").unwrap().build().unwrap();

        assert_eq!(request.url().as_str(),
            "http://localhost:2773/secretsmanager/get?secretId=warehouse");
        assert!(!request.headers().contains_key(SECRETS_TOKEN_HEADER));
    }
}
