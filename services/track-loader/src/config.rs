//!
//! src/config.rs  Andrew Belles  Oct 3rd, 2025
//!
//! Reads the environment once at invocation start: warehouse identity,
//! admission convention for staged files, secret store and logging
//!

use url::Url;
use std::time;
use crate::LoaderError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 4;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

pub const WAREHOUSE_CONNECT_TIMEOUT: u64 = 10000;

/// Wrapper over env::var to return an invalid enviroment var error
fn env_check(s: &str) -> Result<String, LoaderError> {
    match std::env::var(s) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(LoaderError::Config(format!("{s} was not set"))),
    }
}

fn env_or(s: &str, default: &str) -> String {
    match std::env::var(s) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string()
    }
}

fn ensure_trailing_slash(url: &mut Url) {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
}

///
/// Warehouse identity: the host is `<workgroup>.<host_suffix>`
///
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub secret_name: String,
    pub workgroup: String,
    pub host_suffix: String,
    pub port: u16,
    pub database: String,
    pub table: String,
    pub connect_timeout: time::Duration
}

impl WarehouseConfig {
    pub fn host(&self) -> String {
        format!("{}.{}", self.workgroup, self.host_suffix.trim_start_matches('.'))
    }
}

fn parse_port(raw: &str) -> Result<u16, LoaderError> {
    raw.trim().parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| LoaderError::Config(format!("WAREHOUSE_PORT invalid: {raw:?}")))
}

fn build_warehouse() -> Result<WarehouseConfig, LoaderError> {
    let secret_name = env_check("WAREHOUSE_SECRET_NAME")?;
    let workgroup   = env_or("WAREHOUSE_WORKGROUP", "spotify-data");
    let host_suffix = env_check("WAREHOUSE_HOST_SUFFIX")?;
    let port        = parse_port(&env_or("WAREHOUSE_PORT", "5439"))?;
    let database    = env_or("WAREHOUSE_DATABASE", "dev");
    let table       = env_or("WAREHOUSE_TABLE", "Spotify");

    Ok( WarehouseConfig {
        secret_name,
        workgroup,
        host_suffix,
        port,
        database,
        table,
        connect_timeout: time::Duration::from_millis(WAREHOUSE_CONNECT_TIMEOUT)
    })
}

///
/// Which object keys the loader accepts
///
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    pub stage_prefix: String,
    pub suffix: String
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            stage_prefix: "stage-data/".to_string(),
            suffix: ".parquet".to_string()
        }
    }
}

impl AdmissionConfig {
    /// Columnar file under the staging segment, anything else is skipped
    pub fn admits(&self, key: &str) -> bool {
        key.ends_with(&self.suffix) && key.contains(&self.stage_prefix)
    }
}

fn build_admission() -> AdmissionConfig {
    AdmissionConfig {
        stage_prefix: env_or("STAGE_PREFIX", "stage-data/"),
        suffix: env_or("STAGE_SUFFIX", ".parquet")
    }
}

///
/// Configuration for the secret store reached through the local extension
///
#[derive(Debug, Clone)]
pub struct SecretsConfig {
    pub endpoint: Url,
    pub session_token: Option<String>
}

fn build_secrets() -> Result<SecretsConfig, LoaderError> {
    let endpoint = env_or("SECRETS_EXTENSION_URL", "http://localhost:2773/");
    let mut endpoint = Url::parse(&endpoint)
        .map_err(|e| LoaderError::Config(
            format!("SECRETS_EXTENSION_URL invalid {e}")
        ))?;
    ensure_trailing_slash(&mut endpoint);

    let session_token = std::env::var("AWS_SESSION_TOKEN").ok();
    Ok( SecretsConfig { endpoint, session_token } )
}

///
/// Configuration for Http timeouts, pools, etc.
///
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
        }
    }
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,track_loader=debug,sqlx=warn".to_string(),
            format: LogFormat::Json,
            with_ansi: false,
            include_file_line: true,
            include_target: true,
        }
    }
}

fn build_logging() -> LoggingConfig {
    let mut logging = LoggingConfig::default();
    if env_or("LOG_FORMAT", "json").eq_ignore_ascii_case("pretty") {
        logging.format = LogFormat::Pretty;
        logging.with_ansi = true;
    }
    logging
}

///
/// AppConfig which holds everything a loader run needs
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub warehouse: WarehouseConfig,
    pub admission: AdmissionConfig,
    pub secrets: SecretsConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, LoaderError> {
    dotenvy::dotenv().ok();

    let warehouse = build_warehouse()?;
    let admission = build_admission();
    let secrets   = build_secrets()?;
    let http      = HttpConfig::default();
    let logging   = build_logging();

    Ok( AppConfig { warehouse, admission, secrets, http, logging } )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_filter() {
        let admission = AdmissionConfig::default();

        assert!(admission.admits("stage-data/file1.parquet"));
        assert!(admission.admits("exports/stage-data/2024/file1.parquet"));

        assert!(!admission.admits("stage-data/file1.csv"));
        assert!(!admission.admits("raw-data/file1.parquet"));
        assert!(!admission.admits("stage-data/file1.parquet.tmp"));
        assert!(!admission.admits("stage-data.parquet"));
        assert!(!admission.admits(""));
    }

    #[test]
    fn warehouse_host_joins_workgroup() {
        let cfg = WarehouseConfig {
            secret_name: "wh".to_string(),
            workgroup: "spotify-data".to_string(),
            host_suffix: ".123456789012.us-east-1.redshift-serverless.amazonaws.com".to_string(),
            port: 5439,
            database: "dev".to_string(),
            table: "Spotify".to_string(),
            connect_timeout: time::Duration::from_secs(1)
        };
        assert_eq!(
            cfg.host(),
            "spotify-data.123456789012.us-east-1.redshift-serverless.amazonaws.com"
        );
    }

    #[test]
    fn port_parsing() {
        assert_eq!(parse_port("5439").unwrap(), 5439);
        assert!(parse_port("0").is_err());
        assert!(parse_port("70000").is_err());
        assert!(parse_port("redshift").is_err());
    }
}
