use anyhow::{Context, Result};
use bday_core::{Authorization, DeliveryTime, NotificationPreference, SchedulerConfig, DEFAULT_CEILING};
use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::ensure_bday_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub delivery: DeliverySection,
    pub scheduler: SchedulerSection,
    pub notifications: NotificationsSection,
    pub calendar: CalendarSection,
    pub contacts: ContactsSection,
    /// Group name -> notification settings.
    pub groups: BTreeMap<String, GroupSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySection {
    /// 0-23, local time.
    pub hour: u32,
    /// 0-59.
    pub minute: u32,
}

impl Default for DeliverySection {
    fn default() -> Self {
        Self { hour: 9, minute: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Maximum outstanding reminders the delivery service accepts.
    pub ceiling: usize,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_CEILING,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsSection {
    pub authorization: Authorization,
}

impl Default for NotificationsSection {
    fn default() -> Self {
        Self {
            authorization: Authorization::Authorized,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSection {
    /// IANA zone such as "America/Chicago". System local time when unset.
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactsSection {
    /// Contacts export (CSV or vCard). Defaults to `$BDAY_HOME/contacts.csv`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSection {
    pub preference: NotificationPreference,
}

impl Config {
    pub fn scheduler_config(&self) -> Result<SchedulerConfig> {
        let delivery = DeliveryTime::new(self.delivery.hour, self.delivery.minute)
            .context("invalid [delivery] hour/minute in config.toml")?;
        Ok(SchedulerConfig {
            ceiling: self.scheduler.ceiling,
            delivery,
        })
    }

    pub fn group_preferences(&self) -> HashMap<String, NotificationPreference> {
        self.groups
            .iter()
            .map(|(name, g)| (name.clone(), g.preference))
            .collect()
    }

    /// Current local wall-clock time in the configured zone.
    pub fn now_local(&self) -> Result<NaiveDateTime> {
        match self.calendar.timezone.as_deref() {
            Some(tz) => {
                let tz: Tz = tz
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))?;
                Ok(Utc::now().with_timezone(&tz).naive_local())
            }
            None => Ok(chrono::Local::now().naive_local()),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_bday_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let mut cfg = Config::default();
    cfg.groups.insert(
        "Family".to_string(),
        GroupSection {
            preference: NotificationPreference::Both,
        },
    );
    save_config_to(&cfg, &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}
