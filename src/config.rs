use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::errors::ResearchError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Server-side credentials for the search and LLM collaborators.
///
/// All three are optional at the server level: a research request may
/// supply them instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub google_api_key: Option<String>,
    #[serde(default)]
    pub google_cse_id: Option<String>,
}

impl CredentialsConfig {
    /// Names of the credentials that are absent or blank
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(self.openai_api_key.as_deref()) {
            missing.push("openai_api_key");
        }
        if is_blank(self.google_api_key.as_deref()) {
            missing.push("google_api_key");
        }
        if is_blank(self.google_cse_id.as_deref()) {
            missing.push("google_cse_id");
        }
        missing
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_search_min_wait_ms")]
    pub retry_min_wait_ms: u64,
    #[serde(default = "default_search_max_wait_ms")]
    pub retry_max_wait_ms: u64,
    /// TTL for memoized image and video searches
    #[serde(default = "default_media_cache_ttl_secs")]
    pub media_cache_ttl_secs: u64,
}

fn default_search_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".to_string()
}

fn default_max_results() -> usize {
    5
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_search_min_wait_ms() -> u64 {
    4000
}

fn default_search_max_wait_ms() -> u64 {
    10000
}

fn default_media_cache_ttl_secs() -> u64 {
    3600
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            max_results: default_max_results(),
            timeout_secs: default_http_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_min_wait_ms: default_search_min_wait_ms(),
            retry_max_wait_ms: default_search_max_wait_ms(),
            media_cache_ttl_secs: default_media_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_scrape_min_wait_ms")]
    pub retry_min_wait_ms: u64,
    #[serde(default = "default_scrape_max_wait_ms")]
    pub retry_max_wait_ms: u64,
    #[serde(default = "default_scrape_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_max_concurrent() -> usize {
    5
}

fn default_scrape_min_wait_ms() -> u64 {
    500
}

fn default_scrape_max_wait_ms() -> u64 {
    4000
}

fn default_scrape_cache_ttl_secs() -> u64 {
    7200
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout_secs(),
            max_concurrent: default_max_concurrent(),
            retry_attempts: default_retry_attempts(),
            retry_min_wait_ms: default_scrape_min_wait_ms(),
            retry_max_wait_ms: default_scrape_max_wait_ms(),
            cache_ttl_secs: default_scrape_cache_ttl_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_llm_min_wait_ms")]
    pub retry_min_wait_ms: u64,
    #[serde(default = "default_llm_max_wait_ms")]
    pub retry_max_wait_ms: u64,
}

fn default_llm_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    8000
}

fn default_llm_timeout_secs() -> u64 {
    120
}

fn default_llm_min_wait_ms() -> u64 {
    1000
}

fn default_llm_max_wait_ms() -> u64 {
    8000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_min_wait_ms: default_llm_min_wait_ms(),
            retry_max_wait_ms: default_llm_max_wait_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// `openai`, `ollama` or `hashing`
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimension() -> usize {
    1536
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            endpoint: default_llm_endpoint(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// `local` (persisted JSON collection) or `postgres` (pgvector)
    #[serde(default = "default_vector_backend")]
    pub backend: String,
    #[serde(default = "default_persist_directory")]
    pub persist_directory: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_vector_backend() -> String {
    "local".to_string()
}

fn default_persist_directory() -> String {
    "./vector_db".to_string()
}

fn default_collection() -> String {
    "research_content".to_string()
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_vector_backend(),
            persist_directory: default_persist_directory(),
            collection: default_collection(),
            database_url: None,
            max_connections: default_db_max_connections(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_max_topics")]
    pub max_topics: usize,
    #[serde(default = "default_max_related_queries")]
    pub max_related_queries: usize,
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,
    #[serde(default = "default_max_concurrent")]
    pub credibility_concurrency: usize,
}

fn default_max_topics() -> usize {
    5
}

fn default_max_related_queries() -> usize {
    5
}

fn default_max_text_length() -> usize {
    50_000
}

fn default_min_text_length() -> usize {
    100
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_topics: default_max_topics(),
            max_related_queries: default_max_related_queries(),
            max_text_length: default_max_text_length(),
            min_text_length: default_min_text_length(),
            credibility_concurrency: default_max_concurrent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_expire_seconds")]
    pub expire_seconds: u64,
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_cache_namespace")]
    pub namespace: String,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

fn default_cache_expire_seconds() -> u64 {
    3600
}

fn default_cache_max_entries() -> usize {
    10_000
}

fn default_cache_namespace() -> String {
    "research:cache:".to_string()
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expire_seconds: default_cache_expire_seconds(),
            max_entries: default_cache_max_entries(),
            namespace: default_cache_namespace(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_host")]
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    #[serde(default)]
    pub db: i64,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_redis_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_redis_connect_timeout_secs() -> u64 {
    5
}

impl RedisConfig {
    /// Connection URL in the form the redis crate expects
    pub fn url(&self) -> String {
        match self.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            db: 0,
            password: None,
            connect_timeout_secs: default_redis_connect_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// When set, protected endpoints require a matching `X-API-Key` header
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_enable_cors() -> bool {
    true
}

fn default_reports_dir() -> String {
    "reports".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            api_key: None,
            enable_cors: default_enable_cors(),
            reports_dir: default_reports_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
}

fn default_results_dir() -> String {
    "results".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Result of [`AppConfig::validate`]
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Credentials the server lacks; requests must then supply them
    pub missing_credentials: Vec<&'static str>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

const VALID_LOG_LEVELS: [&str; 7] = [
    "trace", "debug", "info", "warn", "warning", "error", "critical",
];

impl AppConfig {
    /// Load configuration from a TOML file, without environment layering
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ResearchError::Io)?;

        let config: AppConfig = toml::from_str(&content).map_err(ResearchError::TomlParsing)?;

        Ok(config)
    }

    /// Load configuration from defaults, `config.toml` (if present) and the environment
    pub fn load() -> crate::Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an explicit config file.
    ///
    /// Layers, lowest precedence first: built-in defaults, the config file,
    /// `RESEARCH__SECTION__KEY` variables, then the flat variable names
    /// (`OPENAI_API_KEY`, `REDIS_HOST`, ...).
    pub fn load_from(path: Option<&Path>) -> crate::Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path.to_path_buf()).required(true)),
            None => builder.add_source(config::File::with_name("config").required(false)),
        };

        builder = builder.add_source(
            config::Environment::with_prefix("RESEARCH")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: AppConfig = builder.build()?.try_deserialize()?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply the flat environment variable names.
    ///
    /// `lookup` is injected so tests do not touch the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_API_KEY") {
            self.credentials.openai_api_key = Some(v);
        }
        if let Some(v) = get("GOOGLE_API_KEY") {
            self.credentials.google_api_key = Some(v);
        }
        if let Some(v) = get("GOOGLE_CSE_ID") {
            self.credentials.google_cse_id = Some(v);
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = get("API_HOST") {
            self.api.host = v;
        }
        if let Some(v) = get("API_PORT") {
            self.api.port = parse_env("API_PORT", &v)?;
        }
        if let Some(v) = get("API_KEY") {
            self.api.api_key = Some(v);
        }
        if let Some(v) = get("REPORTS_DIR") {
            self.api.reports_dir = v;
        }
        if let Some(v) = get("REDIS_HOST") {
            self.redis.host = v;
        }
        if let Some(v) = get("REDIS_PORT") {
            self.redis.port = parse_env("REDIS_PORT", &v)?;
        }
        if let Some(v) = get("REDIS_DB") {
            self.redis.db = parse_env("REDIS_DB", &v)?;
        }
        if let Some(v) = get("REDIS_PASSWORD") {
            self.redis.password = Some(v);
        }
        if let Some(v) = get("MAX_SEARCH_RESULTS") {
            self.search.max_results = parse_env("MAX_SEARCH_RESULTS", &v)?;
        }
        if let Some(v) = get("MAX_TOPICS") {
            self.analysis.max_topics = parse_env("MAX_TOPICS", &v)?;
        }
        if let Some(v) = get("CACHE_EXPIRE_SECONDS") {
            self.cache.expire_seconds = parse_env("CACHE_EXPIRE_SECONDS", &v)?;
        }
        if let Some(v) = get("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("LLM_TEMPERATURE") {
            self.llm.temperature = parse_env("LLM_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("MAX_TOKENS") {
            self.llm.max_tokens = parse_env("MAX_TOKENS", &v)?;
        }
        if let Some(v) = get("VECTOR_STORE_DIR").or_else(|| get("CHROMA_PERSIST_DIRECTORY")) {
            self.vector_store.persist_directory = v;
        }
        if let Some(v) = get("DATABASE_URL") {
            self.vector_store.database_url = Some(v);
        }
        if let Some(v) = get("CHUNK_SIZE") {
            self.vector_store.chunk_size = parse_env("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = get("CHUNK_OVERLAP") {
            self.vector_store.chunk_overlap = parse_env("CHUNK_OVERLAP", &v)?;
        }

        Ok(())
    }

    /// Check settings that cannot be expressed in the types
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            report.errors.push(format!(
                "Log level must be one of DEBUG, INFO, WARNING, ERROR, CRITICAL (got {})",
                self.logging.level
            ));
        }

        report.missing_credentials = self.credentials.missing();

        if self.search.max_results == 0 {
            report
                .errors
                .push("search.max_results must be at least 1".to_string());
        } else if self.search.max_results > 10 {
            report.warnings.push(format!(
                "search.max_results = {} exceeds the provider limit of 10 per request",
                self.search.max_results
            ));
        }

        if self.scraper.max_concurrent == 0 {
            report
                .errors
                .push("scraper.max_concurrent must be at least 1".to_string());
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            report.errors.push(format!(
                "llm.temperature must be between 0.0 and 2.0 (got {})",
                self.llm.temperature
            ));
        }

        if self.vector_store.chunk_size == 0
            || self.vector_store.chunk_overlap >= self.vector_store.chunk_size
        {
            report.errors.push(format!(
                "vector_store.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.vector_store.chunk_overlap, self.vector_store.chunk_size
            ));
        }

        match self.vector_store.backend.as_str() {
            "local" => {}
            "postgres" => {
                if self.vector_store.database_url.is_none() {
                    report.errors.push(
                        "vector_store.database_url is required for the postgres backend"
                            .to_string(),
                    );
                }
            }
            other => report
                .errors
                .push(format!("Unknown vector_store.backend: {other}")),
        }

        if !matches!(
            self.embeddings.provider.as_str(),
            "openai" | "ollama" | "hashing"
        ) {
            report.errors.push(format!(
                "Unknown embeddings.provider: {}",
                self.embeddings.provider
            ));
        }

        report
    }

    /// Log level in the form `EnvFilter` understands
    pub fn log_level(&self) -> String {
        match self.logging.level.to_lowercase().as_str() {
            "warning" => "warn".to_string(),
            "critical" => "error".to_string(),
            other => other.to_string(),
        }
    }

    /// Get reports directory
    pub fn reports_dir(&self) -> PathBuf {
        PathBuf::from(&self.api.reports_dir)
    }

    /// Get vector store persistence directory
    pub fn persist_directory(&self) -> PathBuf {
        PathBuf::from(&self.vector_store.persist_directory)
    }

    /// Get default number of results per search source
    pub fn max_search_results(&self) -> usize {
        self.search.max_results
    }

    /// Get LLM model
    pub fn llm_model(&self) -> &str {
        &self.llm.model
    }

    /// Check if an API key gate is configured
    pub fn api_key_required(&self) -> bool {
        self.api
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}

fn parse_env<T>(name: &str, value: &str) -> crate::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ResearchError::ConfigError(format!("Invalid value for {name}: {e}")))
}
