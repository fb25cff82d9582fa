use std::{env, path::Path, path::PathBuf, str::FromStr, time::Duration};

use config::{Config as config_config, File as config_file};
use serde::{Deserialize, Serialize};

const CONFIG_PATH: &str = "kabu.json";

#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub news: NewsSettings,
    #[serde(default)]
    pub log: LogSettings,
    #[serde(default)]
    pub sites: SiteSettings,
}

const KABU_HTTP_CONNECT_TIMEOUT_SECS: &str = "KABU_HTTP_CONNECT_TIMEOUT_SECS";
const KABU_HTTP_TIMEOUT_SECS: &str = "KABU_HTTP_TIMEOUT_SECS";
const KABU_USER_AGENT: &str = "KABU_USER_AGENT";
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HttpSettings {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 未設定ならブラウザの UA をランダムに使う
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_connect_timeout_secs() -> u64 {
    8
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

const KABU_PAGE_DELAY_MS: &str = "KABU_PAGE_DELAY_MS";
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewsSettings {
    /// Pause between two page requests of a news listing walk.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

fn default_page_delay_ms() -> u64 {
    1000
}

impl NewsSettings {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

impl Default for NewsSettings {
    fn default() -> Self {
        NewsSettings {
            page_delay_ms: default_page_delay_ms(),
        }
    }
}

const KABU_LOG_ENABLED: &str = "KABU_LOG_ENABLED";
const KABU_LOG_DIR: &str = "KABU_LOG_DIR";
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_log_name")]
    pub name: String,
}

fn default_log_directory() -> String {
    "log".to_string()
}

fn default_log_name() -> String {
    "kabu".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            enabled: false,
            directory: default_log_directory(),
            name: default_log_name(),
        }
    }
}

const KABU_KABUYOHO_URL: &str = "KABU_KABUYOHO_URL";
const KABU_MINKABU_URL: &str = "KABU_MINKABU_URL";
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SiteSettings {
    #[serde(default = "default_kabuyoho_url")]
    pub kabuyoho_url: String,
    #[serde(default = "default_minkabu_url")]
    pub minkabu_url: String,
}

fn default_kabuyoho_url() -> String {
    "https://kabuyoho.jp".to_string()
}

fn default_minkabu_url() -> String {
    "https://minkabu.jp".to_string()
}

impl Default for SiteSettings {
    fn default() -> Self {
        SiteSettings {
            kabuyoho_url: default_kabuyoho_url(),
            minkabu_url: default_minkabu_url(),
        }
    }
}

impl Settings {
    /// Reads `.env`, then `kabu.json` when it exists, then `KABU_*` variables.
    ///
    /// Nothing here runs unless the caller asks for it; [`Settings::default`]
    /// touches neither the file system nor the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let config_path = config_path();
        let settings = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            Settings::default()
        };

        Ok(settings.override_with_env())
    }

    pub fn from_file(path: &Path) -> Result<Self, config::ConfigError> {
        config_config::builder()
            .add_source(config_file::from(path))
            .build()?
            .try_deserialize()
    }

    /// 環境変数の値で設定ファイルの値を上書きする
    fn override_with_env(self) -> Self {
        self.override_with(|key| env::var(key).ok())
    }

    fn override_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(secs) = lookup(KABU_HTTP_CONNECT_TIMEOUT_SECS).and_then(|v| u64::from_str(&v).ok()) {
            self.http.connect_timeout_secs = secs;
        }

        if let Some(secs) = lookup(KABU_HTTP_TIMEOUT_SECS).and_then(|v| u64::from_str(&v).ok()) {
            self.http.timeout_secs = secs;
        }

        if let Some(ua) = lookup(KABU_USER_AGENT) {
            self.http.user_agent = Some(ua);
        }

        if let Some(ms) = lookup(KABU_PAGE_DELAY_MS).and_then(|v| u64::from_str(&v).ok()) {
            self.news.page_delay_ms = ms;
        }

        if let Some(enabled) = lookup(KABU_LOG_ENABLED).and_then(|v| bool::from_str(&v).ok()) {
            self.log.enabled = enabled;
        }

        if let Some(dir) = lookup(KABU_LOG_DIR) {
            self.log.directory = dir;
        }

        if let Some(url) = lookup(KABU_KABUYOHO_URL) {
            self.sites.kabuyoho_url = url;
        }

        if let Some(url) = lookup(KABU_MINKABU_URL) {
            self.sites.minkabu_url = url;
        }

        self
    }
}

/// 設定ファイルのパス
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
