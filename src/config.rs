use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;

/// Non-secret configuration, loaded from a TOML file.
///
/// Every field has a default, so an empty (or missing) config file yields
/// a working setup. Credentials never live here — see [`Secrets`].
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub digest: DigestConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    sources: Vec<SourceConfig>,
}

/// The two daily cron schedules (6-field expressions, UTC).
#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_morning_cron")]
    pub morning_cron: String,
    #[serde(default = "default_evening_cron")]
    pub evening_cron: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DigestConfig {
    /// Timezone used for the greeting and the date line.
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    /// Name addressed in the digest greeting.
    #[serde(default = "default_recipient")]
    pub recipient: String,
    /// Closing line appended to every digest.
    #[serde(default = "default_signature")]
    pub signature: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrapeConfig {
    /// Headlines kept per source, after selector matching.
    #[serde(default = "default_max_per_source")]
    pub max_per_source: usize,
    #[serde(default = "default_scrape_timeout_secs")]
    pub timeout_secs: u64,
    /// Several of the default sources serve broken certificate chains.
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    /// User IDs allowed to issue bot commands (/digest etc.).
    #[serde(default)]
    pub allowed_user_ids: Vec<u64>,
}

/// One news site and the CSS selector matching its headline elements.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    pub selector: String,
}

fn default_morning_cron() -> String {
    // 02:30 UTC = 08:00 IST
    "0 30 2 * * *".to_string()
}

fn default_evening_cron() -> String {
    // 13:30 UTC = 19:00 IST
    "0 30 13 * * *".to_string()
}

fn default_timezone() -> Tz {
    chrono_tz::Asia::Kolkata
}

fn default_recipient() -> String {
    "Mr. Keshav Agarwal".to_string()
}

fn default_signature() -> String {
    "\u{1F680} Stay ahead with CD Jindal AI Assistant".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_timeout_secs() -> u64 {
    60
}

fn default_max_per_source() -> usize {
    10
}

fn default_scrape_timeout_secs() -> u64 {
    20
}

fn default_accept_invalid_certs() -> bool {
    true
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            morning_cron: default_morning_cron(),
            evening_cron: default_evening_cron(),
        }
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            recipient: default_recipient(),
            signature: default_signature(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
            timeout_secs: default_gemini_timeout_secs(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_per_source: default_max_per_source(),
            timeout_secs: default_scrape_timeout_secs(),
            accept_invalid_certs: default_accept_invalid_certs(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Configured sources, or the built-in roster when the file lists none.
    pub fn sources(&self) -> Vec<SourceConfig> {
        if self.sources.is_empty() {
            default_sources()
        } else {
            self.sources.clone()
        }
    }
}

fn default_sources() -> Vec<SourceConfig> {
    let roster = [
        ("ET Infra", "https://infra.economictimes.indiatimes.com/", "h3 a"),
        (
            "Infrastructure Today",
            "https://infrastructuretoday.co.in/",
            ".jeg_post_title a",
        ),
        (
            "L&T",
            "https://www.larsentoubro.com/corporate/media/press-releases/",
            "div.latest-news h3 a",
        ),
        (
            "Construction World",
            "https://www.constructionworld.in/latest-news",
            "h3 a",
        ),
        ("ONGC", "https://ongcindia.com/", "div.news a"),
        (
            "Projects Today",
            "https://www.projectstoday.com/News",
            "div.card h4 a",
        ),
        (
            "BEML",
            "https://www.bemlindia.in/press-release/",
            "div.page-title h1",
        ),
    ];
    roster
        .iter()
        .map(|(name, url, selector)| SourceConfig {
            name: name.to_string(),
            url: url.to_string(),
            selector: selector.to_string(),
        })
        .collect()
}

/// The three credentials, read from the environment only.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub gemini_api_key: String,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            telegram_bot_token: require_env("TELEGRAM_BOT_TOKEN")?,
            telegram_chat_id: require_env("TELEGRAM_CHAT_ID")?,
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    let value = std::env::var(name)
        .with_context(|| format!("Environment variable {} is not set", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("Environment variable {} is empty", name);
    }
    Ok(value)
}
