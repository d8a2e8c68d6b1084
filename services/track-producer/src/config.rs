//!
//! src/config.rs  Andrew Belles  Oct 2nd, 2025
//!
//! Reads the environment once at invocation start into the configuration
//! structs that the fetch, sink and secrets modules expect
//!

use url::Url;
use std::time;
use crate::ProducerError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 4;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

/// The search endpoint caps a single page at 50 items
pub const SEARCH_LIMIT_MAX: u32 = 50;

/// Wrapper over env::var to return an invalid enviroment var error
fn env_check(s: &str) -> Result<String, ProducerError> {
    match std::env::var(s) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ProducerError::Config(format!("{s} was not set"))),
    }
}

fn env_or(s: &str, default: &str) -> String {
    match std::env::var(s) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string()
    }
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(
            format!("Unexpected host for {url} (got {h}, expected {expected_host})")
        ),
        None => Err(format!("URL missing host: {url}"))
    }
}

fn ensure_trailing_slash(url: &mut Url) {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
}

fn parse_search_limit(raw: &str) -> Result<u32, ProducerError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if (1..=SEARCH_LIMIT_MAX).contains(&n) => Ok(n),
        _ => Err(ProducerError::Config(
            format!("SEARCH_LIMIT must be within 1..={SEARCH_LIMIT_MAX}, got {raw:?}")
        ))
    }
}

/// Configuration that Spotify expects when hitting endpoints. Client
/// credentials are not part of it, they come from the secret store per run
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub token_url: Url,
    pub api_base: Url,
}

fn build_spotify() -> Result<SpotifyConfig, ProducerError> {
    // form urls
    let token_url = env_or("SPOTIFY_TOKEN_URL", "https://accounts.spotify.com/api/token");
    let api_base  = env_or("SPOTIFY_API_BASE", "https://api.spotify.com/v1/");

    let token_url = Url::parse(&token_url)
        .map_err(|e| ProducerError::Config(
                format!("SPOTIFY_TOKEN_URL invalid {e}")
        ))?;

    let mut api_base  = Url::parse(&api_base)
        .map_err(|e| ProducerError::Config(
                format!("SPOTIFY_API_BASE invalid {e}")
        ))?;

    // ensure valid https and hostname for both urls
    ensure_https(&token_url).map_err(ProducerError::Config)?;
    ensure_https(&api_base).map_err(ProducerError::Config)?;
    ensure_host(&token_url, "accounts.spotify.com")
        .map_err(ProducerError::Config)?;
    ensure_host(&api_base, "api.spotify.com")
        .map_err(ProducerError::Config)?;

    ensure_trailing_slash(&mut api_base);

    Ok( SpotifyConfig { token_url, api_base })
}

///
/// Which secret holds the catalog credentials and under which fields
///
#[derive(Debug, Clone)]
pub struct CredentialsConfig {
    pub secret_name: String,
    pub client_id_field: String,
    pub client_secret_field: String
}

fn build_credentials() -> Result<CredentialsConfig, ProducerError> {
    let secret_name         = env_check("CATALOG_SECRET_NAME")?;
    let client_id_field     = env_or("CATALOG_CLIENT_ID_FIELD", "client_id");
    let client_secret_field = env_or("CATALOG_CLIENT_SECRET_FIELD", "client_secret");

    Ok( CredentialsConfig { secret_name, client_id_field, client_secret_field } )
}

///
/// Configuration for the secret store reached through the local extension
///
#[derive(Debug, Clone)]
pub struct SecretsConfig {
    pub endpoint: Url,
    pub session_token: Option<String>
}

fn build_secrets() -> Result<SecretsConfig, ProducerError> {
    let endpoint = env_or("SECRETS_EXTENSION_URL", "http://localhost:2773/");
    let mut endpoint = Url::parse(&endpoint)
        .map_err(|e| ProducerError::Config(
            format!("SECRETS_EXTENSION_URL invalid {e}")
        ))?;
    ensure_trailing_slash(&mut endpoint);

    let session_token = std::env::var("AWS_SESSION_TOKEN").ok();
    Ok( SecretsConfig { endpoint, session_token } )
}

///
/// Search issued against the catalog on every run
///
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub query: String,
    pub limit: u32
}

fn build_search() -> Result<SearchConfig, ProducerError> {
    let query = env_or("SEARCH_QUERY", "all");
    let limit = parse_search_limit(&env_or("SEARCH_LIMIT", "50"))?;
    Ok( SearchConfig { query, limit } )
}

///
/// Where the raw batch is written, locally and in object storage
///
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub raw_prefix: String,
    pub file_stem: String,
    pub scratch_dir: String
}

impl StorageConfig {
    /// spotify-test-2024-01-01.csv
    pub fn file_name(&self, day: chrono::NaiveDate) -> String {
        format!("{}-{}.csv", self.file_stem, day.format("%Y-%m-%d"))
    }

    /// raw-data/spotify-test-2024-01-01.csv
    pub fn object_key(&self, file_name: &str) -> String {
        format!("{}{file_name}", self.raw_prefix)
    }
}

fn build_storage() -> Result<StorageConfig, ProducerError> {
    let bucket      = env_check("RAW_BUCKET")?;
    let mut raw_prefix = env_or("RAW_PREFIX", "raw-data/");
    if !raw_prefix.ends_with('/') {
        raw_prefix.push('/');
    }
    let file_stem   = env_or("RAW_FILE_STEM", "spotify-test");
    let scratch_dir = env_or("SCRATCH_DIR", "/tmp");

    Ok( StorageConfig { bucket, raw_prefix, file_stem, scratch_dir } )
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
            filter_directives: "info,track_producer=debug,reqwest=warn".to_string(),
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
/// AppConfig which holds everything a producer run needs
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub spotify: SpotifyConfig,
    pub credentials: CredentialsConfig,
    pub secrets: SecretsConfig,
    pub search: SearchConfig,
    pub storage: StorageConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, ProducerError> {
    dotenvy::dotenv().ok();

    let spotify     = build_spotify()?;
    let credentials = build_credentials()?;
    let secrets     = build_secrets()?;
    let search      = build_search()?;
    let storage     = build_storage()?;
    let http        = HttpConfig::default();
    let logging     = build_logging();

    Ok( AppConfig {
        spotify, credentials, secrets, search, storage, http, logging
    } )
}
