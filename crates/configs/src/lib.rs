use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 3001, worker_threads: Some(4) }
    }
}

/// On-disk layout of the reviews file.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewLayout {
    /// `Title,Rating,Content,RatingType,ProductBarcode,UserName,Date`; the user is
    /// referenced by name and ids are rebuilt on every load.
    Legacy,
    /// `Id,UserId,Title,Rating,Content,RatingType,ProductBarcode,Date`.
    #[default]
    Keyed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_users_file")]
    pub users_file: String,
    #[serde(default = "default_reviews_file")]
    pub reviews_file: String,
    #[serde(default)]
    pub review_layout: ReviewLayout,
    /// Surface unreadable files as errors instead of treating them as empty.
    #[serde(default)]
    pub strict_reads: bool,
    /// Reject reviews whose `userId` does not match an existing user.
    #[serde(default)]
    pub require_existing_user: bool,
}

fn default_data_dir() -> String { "data".into() }
fn default_users_file() -> String { "data/users.csv".into() }
fn default_reviews_file() -> String { "data/reviews.csv".into() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            users_file: default_users_file(),
            reviews_file: default_reviews_file(),
            review_layout: ReviewLayout::default(),
            strict_reads: false,
            require_existing_user: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CorsConfig {
    /// Single allowed origin; `None` means a very permissive policy.
    #[serde(default)]
    pub allowed_origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String { "compact".into() }

impl Default for LoggingConfig {
    fn default() -> Self { Self { format: default_log_format() } }
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

/// Defaults overridden by `SERVER_HOST`, `SERVER_PORT`, `USERS_FILE` and `REVIEWS_FILE`.
pub fn from_env() -> AppConfig {
    let mut cfg = AppConfig::default();
    if let Ok(host) = std::env::var("SERVER_HOST") {
        cfg.server.host = host;
    }
    if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
        cfg.server.port = port;
    }
    cfg.storage.apply_env();
    cfg
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), falling back to env-derived defaults
    /// when the file is absent, then normalize.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_not_found(&e) => from_env(),
            Err(e) => return Err(e),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.storage.validate()?;
        if let Some(origin) = &self.cors.allowed_origin {
            if origin.trim().is_empty() {
                self.cors.allowed_origin = None;
            }
        }
        Ok(())
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl StorageConfig {
    /// Fill file paths from `USERS_FILE` / `REVIEWS_FILE` when set.
    pub fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("USERS_FILE") {
            self.users_file = path;
        }
        if let Ok(path) = std::env::var("REVIEWS_FILE") {
            self.reviews_file = path;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.users_file.trim().is_empty() {
            return Err(anyhow!("storage.users_file is empty"));
        }
        if self.reviews_file.trim().is_empty() {
            return Err(anyhow!("storage.reviews_file is empty"));
        }
        if self.users_file == self.reviews_file {
            return Err(anyhow!("storage.users_file and storage.reviews_file must differ"));
        }
        Ok(())
    }
}
