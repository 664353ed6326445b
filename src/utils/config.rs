//! Settings stored as `config.json` inside the application directory. Every field has a default,
//! so a missing file or a partial one is fine. A few values can be overridden through the
//! environment, which is handy for secrets like the insight API key.

use std::{
    fs::{self, File},
    path::Path,
    time::Duration,
};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "config.json";

pub const REMOTE_URL_ENV: &str = "CLARITY_REMOTE_URL";
pub const USER_ID_ENV: &str = "CLARITY_USER_ID";
pub const INSIGHT_KEY_ENV: &str = "GEMINI_API_KEY";

const DEFAULT_DISTRACTION_DOMAINS: [&str; 10] = [
    "youtube.com",
    "instagram.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "tiktok.com",
    "reddit.com",
    "netflix.com",
    "hulu.com",
    "twitch.tv",
];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TrackingSettings {
    /// Contexts containing any of these are not counted as focus time.
    pub distraction_domains: Vec<String>,
    /// A visibility loss sooner than this after the previous switch counts as a distraction.
    pub quick_switch_threshold_ms: u64,
    pub quick_switch_penalty_ms: u64,
    pub base_switch_penalty_ms: u64,
    /// Ticks are written out at most once per this many events. Visibility changes, day
    /// rollover and shutdown always flush.
    pub flush_every_events: u32,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            distraction_domains: DEFAULT_DISTRACTION_DOMAINS
                .iter()
                .map(|v| v.to_string())
                .collect(),
            quick_switch_threshold_ms: 30_000,
            quick_switch_penalty_ms: 3 * 60 * 1000,
            base_switch_penalty_ms: 2 * 60 * 1000,
            flush_every_events: 1,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RemoteSettings {
    /// For example `http://localhost:5000/api`
    pub base_url: String,
    pub user_id: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl RemoteSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InsightSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for InsightSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash".into(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl InsightSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    5000
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub tracking: TrackingSettings,
    pub refresh_interval_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteSettings>,
    pub insights: InsightSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tracking: TrackingSettings::default(),
            refresh_interval_seconds: 5,
            remote: None,
            insights: InsightSettings::default(),
        }
    }
}

impl Settings {
    /// Reads settings from `app_dir`, falling back to defaults when no file exists, then applies
    /// environment overrides.
    pub fn read(app_dir: &Path) -> Result<Settings> {
        let path = app_dir.join(CONFIG_FILE_NAME);
        let settings = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str::<Settings>(&content)?
        } else {
            debug!("No settings at {path:?}, using defaults");
            Settings::default()
        };
        Ok(settings.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn save(&self, app_dir: &Path) -> Result<()> {
        let file = File::create(app_dir.join(CONFIG_FILE_NAME))?;
        serde_json::to_writer_pretty(&file, self)?;
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds.max(1))
    }

    /// Applies overrides from `lookup`. A remote section is created from the environment only when
    /// both the url and the user are known.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(INSIGHT_KEY_ENV).filter(|v| !v.is_empty()) {
            self.insights.api_key = Some(key);
        }

        let url = lookup(REMOTE_URL_ENV).filter(|v| !v.is_empty());
        let user = lookup(USER_ID_ENV).filter(|v| !v.is_empty());
        self.remote = match (self.remote.take(), url, user) {
            (Some(mut remote), url, user) => {
                if let Some(url) = url {
                    remote.base_url = url;
                }
                if let Some(user) = user {
                    remote.user_id = user;
                }
                Some(remote)
            }
            (None, Some(base_url), Some(user_id)) => Some(RemoteSettings {
                base_url,
                user_id,
                timeout_ms: default_timeout_ms(),
            }),
            (None, _, _) => None,
        };
        self
    }
}
