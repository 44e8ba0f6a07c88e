use crate::entities::rank::{RankTable, RankTier};
use crate::homes::presenter::PAGE_SIZE;
use crate::homes::service::HomeSettings;
use crate::homes::teleport::DEFAULT_COUNTDOWN_SECONDS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TICK_MILLIS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Yaml,
    Memory,
}

impl StorageKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yaml" => Some(StorageKind::Yaml),
            "memory" => Some(StorageKind::Memory),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct AppConfig {
    pub root: PathBuf,
    pub tick_length: Duration,
    pub storage: StorageKind,
    pub countdown_override: Option<u64>,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        if args.len() < 2 {
            return Err("usage: homes <root> [tick_millis]".to_string());
        }

        let root = Path::new(&args[1]).to_path_buf();
        let tick_millis = match args.get(2) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|millis| *millis > 0)
                .ok_or_else(|| format!("invalid tick_millis '{}'", value))?,
            None => DEFAULT_TICK_MILLIS,
        };
        let storage = match std::env::var("HOMES_STORAGE") {
            Ok(value) if !value.trim().is_empty() => StorageKind::parse(&value)
                .ok_or_else(|| format!("invalid HOMES_STORAGE '{}', expected yaml or memory", value))?,
            _ => StorageKind::Yaml,
        };
        let countdown_override = match std::env::var("HOMES_COUNTDOWN_SECS") {
            Ok(value) => match value.trim().parse::<u64>() {
                Ok(parsed) => Some(parsed),
                Err(_) => {
                    eprintln!(
                        "homes: invalid HOMES_COUNTDOWN_SECS '{}', using homes.yaml value",
                        value
                    );
                    None
                }
            },
            Err(_) => None,
        };
        Ok(Self {
            root,
            tick_length: Duration::from_millis(tick_millis),
            storage,
            countdown_override,
        })
    }
}

/// Contents of `<root>/homes.yaml`; every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomesConfig {
    pub page_size: usize,
    pub teleport_countdown_seconds: u64,
    pub load_retry_seconds: u64,
    pub ranks: Vec<RankTier>,
}

impl Default for HomesConfig {
    fn default() -> Self {
        HomesConfig {
            page_size: PAGE_SIZE,
            teleport_countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            load_retry_seconds: 1,
            ranks: RankTable::default().tiers().to_vec(),
        }
    }
}

impl HomesConfig {
    pub fn path(root: &Path) -> PathBuf {
        root.join("homes.yaml")
    }

    /// Read `<root>/homes.yaml`, falling back to defaults when it is absent.
    pub fn load(root: &Path) -> Result<Self, String> {
        let path = Self::path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
        Self::parse(&text).map_err(|err| format!("{}: {}", path.display(), err))
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: HomesConfig =
            serde_yaml::from_str(text).map_err(|err| format!("invalid homes config: {}", err))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 {
            return Err("page_size must be greater than 0".to_string());
        }
        self.rank_table().map(|_| ())
    }

    pub fn rank_table(&self) -> Result<RankTable, String> {
        RankTable::new(self.ranks.clone())
    }

    pub fn settings(&self, countdown_override: Option<u64>) -> HomeSettings {
        HomeSettings {
            page_size: self.page_size,
            teleport_countdown_seconds: countdown_override
                .unwrap_or(self.teleport_countdown_seconds),
            load_retry_seconds: self.load_retry_seconds,
        }
    }
}
