//! Loading an optional extra level bank from TOML.
//!
//! Operators can point REALM_CONFIG_PATH at a TOML file with `[[levels]]`
//! entries to extend the built-in catalog without rebuilding. Entries are
//! validated one by one; a bad entry is logged and skipped, never fatal.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{LevelDefinition, LevelSample, RegexCategory};
use crate::progress::validate_custom_draft;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct RealmConfig {
  #[serde(default)]
  pub levels: Vec<LevelCfg>,
}

/// Level entry accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct LevelCfg {
  #[serde(default)]
  pub id: Option<String>,
  pub title: String,
  pub objective: String,
  pub hint: String,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub tier: Option<u8>,
  #[serde(default)]
  pub starter_pattern: Option<String>,
  #[serde(default)]
  pub starter_flags: Option<String>,
  #[serde(default)]
  pub samples: Vec<SampleCfg>,
  #[serde(default)]
  pub tags: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SampleCfg {
  pub text: String,
  pub should_match: bool,
  #[serde(default)]
  pub note: Option<String>,
}

/// Turn a bank entry into a catalog level at the given global order.
///
/// Bank ids get a `bank-` prefix namespace so they never collide with the
/// custom-level id space (which feeds the custom-conqueror rule).
pub fn bank_entry_to_level(cfg: &LevelCfg, order: u32, fallback_id: String) -> Result<LevelDefinition, String> {
  let level = LevelDefinition {
    id: cfg.id.clone().unwrap_or(fallback_id),
    order,
    tier: cfg.tier.unwrap_or(1).clamp(1, 5),
    title: cfg.title.clone(),
    objective: cfg.objective.clone(),
    hint: cfg.hint.clone(),
    category: RegexCategory::parse_lossy(cfg.category.as_deref().unwrap_or("literal")),
    starter_pattern: cfg.starter_pattern.clone(),
    starter_flags: cfg.starter_flags.clone(),
    samples: cfg
      .samples
      .iter()
      .map(|s| LevelSample {
        text: s.text.clone(),
        should_match: s.should_match,
        note: s.note.clone(),
      })
      .collect(),
    tags: cfg.tags.clone(),
  };

  validate_custom_draft(&level)?;
  Ok(level)
}

/// Attempt to load `RealmConfig` from REALM_CONFIG_PATH. On any parsing/IO
/// error, returns None.
pub fn load_realm_config_from_env() -> Option<RealmConfig> {
  let path = std::env::var("REALM_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<RealmConfig>(&s) {
      Ok(cfg) => {
        info!(target: "realm_backend", %path, "Loaded realm config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "realm_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "realm_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
