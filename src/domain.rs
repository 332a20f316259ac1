//! Domain models: levels, samples, achievements, and the persisted game state.
//!
//! Wire and storage schemas use camelCase names; the structs below carry the
//! serde renames so the persisted blob and the HTTP/WS payloads agree.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed category tag set for levels. Anything outside the set normalizes to
/// `Literal` when decoding external payloads.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RegexCategory {
  Literal,
  CharacterClass,
  Quantifier,
  Group,
  Lookaround,
  Backreference,
  Unicode,
  Anchor,
}

impl RegexCategory {
  pub fn as_str(&self) -> &'static str {
    match self {
      RegexCategory::Literal => "literal",
      RegexCategory::CharacterClass => "character-class",
      RegexCategory::Quantifier => "quantifier",
      RegexCategory::Group => "group",
      RegexCategory::Lookaround => "lookaround",
      RegexCategory::Backreference => "backreference",
      RegexCategory::Unicode => "unicode",
      RegexCategory::Anchor => "anchor",
    }
  }

  /// Parse a category name, falling back to `Literal` for unknown values.
  pub fn parse_lossy(value: &str) -> Self {
    match value {
      "literal" => RegexCategory::Literal,
      "character-class" => RegexCategory::CharacterClass,
      "quantifier" => RegexCategory::Quantifier,
      "group" => RegexCategory::Group,
      "lookaround" => RegexCategory::Lookaround,
      "backreference" => RegexCategory::Backreference,
      "unicode" => RegexCategory::Unicode,
      "anchor" => RegexCategory::Anchor,
      _ => RegexCategory::Literal,
    }
  }
}

/// One challenge string of a level and whether the pattern should match it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelSample {
  pub text: String,
  pub should_match: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
}

/// A challenge descriptor: built-in, config-bank, or user-authored.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelDefinition {
  pub id: String,
  pub order: u32,
  pub tier: u8,
  pub title: String,
  pub objective: String,
  pub hint: String,
  pub category: RegexCategory,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub starter_pattern: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub starter_flags: Option<String>,
  pub samples: Vec<LevelSample>,
  pub tags: Vec<String>,
}

/// Static tier metadata for the level map.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct TierDefinition {
  pub tier: u8,
  pub name: &'static str,
  pub subtitle: &'static str,
  pub accent: &'static str,
}

/// Last-edited pattern/flags for a level, restored on revisit.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct LevelInput {
  pub pattern: String,
  pub flags: String,
}

/// First-unlock record for one achievement id. The timestamp never changes
/// after the first write.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRecord {
  pub id: String,
  pub unlocked_at: u64,
}

/// Static achievement catalog entry.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct AchievementDefinition {
  pub id: &'static str,
  pub icon: &'static str,
  pub title: &'static str,
  pub description: &'static str,
}

/// The single persisted aggregate. Transitions replace the whole value; no
/// field is mutated in place while other readers can observe it.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
  pub unlocked_level_ids: Vec<String>,
  pub solved_level_ids: Vec<String>,
  pub level_ratings: HashMap<String, u8>,
  pub level_inputs: HashMap<String, LevelInput>,
  pub unlocked_achievements: Vec<UnlockRecord>,
  pub custom_levels: Vec<LevelDefinition>,
  pub invalid_attempts_since_solve: u32,
  pub solved_in_session_streak: u32,
  pub short_regex_wins: u32,
  pub no_backtracking_wins: u32,
  pub fast_wins: u32,
}

/// Decode a level from an untrusted JSON value, field by field.
///
/// Core fields missing or mistyped reject the whole level; malformed sample
/// and tag entries are filtered out; an unknown category normalizes to
/// `literal`. Shared by the storage loader and the share-link codec.
pub fn level_from_value(value: &Value) -> Option<LevelDefinition> {
  let obj = value.as_object()?;

  let id = obj.get("id")?.as_str()?.to_string();
  let order = obj.get("order")?.as_u64()? as u32;
  let tier = obj.get("tier")?.as_u64()? as u8;
  let title = obj.get("title")?.as_str()?.to_string();
  let objective = obj.get("objective")?.as_str()?.to_string();
  let hint = obj.get("hint")?.as_str()?.to_string();
  let category = RegexCategory::parse_lossy(obj.get("category")?.as_str()?);
  let samples = obj.get("samples")?.as_array()?;
  let tags = obj.get("tags")?.as_array()?;

  Some(LevelDefinition {
    id,
    order,
    tier,
    title,
    objective,
    hint,
    category,
    starter_pattern: obj
      .get("starterPattern")
      .and_then(Value::as_str)
      .map(str::to_string),
    starter_flags: obj
      .get("starterFlags")
      .and_then(Value::as_str)
      .map(str::to_string),
    samples: samples.iter().filter_map(sample_from_value).collect(),
    tags: tags
      .iter()
      .filter_map(Value::as_str)
      .map(str::to_string)
      .collect(),
  })
}

fn sample_from_value(value: &Value) -> Option<LevelSample> {
  let obj = value.as_object()?;
  Some(LevelSample {
    text: obj.get("text")?.as_str()?.to_string(),
    should_match: obj.get("shouldMatch")?.as_bool()?,
    note: obj.get("note").and_then(Value::as_str).map(str::to_string),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn category_round_trips_through_kebab_case() {
    let json = serde_json::to_string(&RegexCategory::CharacterClass).unwrap();
    assert_eq!(json, "\"character-class\"");
    assert_eq!(RegexCategory::parse_lossy("character-class"), RegexCategory::CharacterClass);
    assert_eq!(RegexCategory::parse_lossy("bogus"), RegexCategory::Literal);
  }

  #[test]
  fn level_from_value_requires_core_fields() {
    let missing_samples = json!({
      "id": "x", "order": 1, "tier": 1,
      "title": "t", "objective": "o", "hint": "h",
      "category": "anchor", "tags": []
    });
    assert!(level_from_value(&missing_samples).is_none());

    let mistyped_order = json!({
      "id": "x", "order": "first", "tier": 1,
      "title": "t", "objective": "o", "hint": "h",
      "category": "anchor", "samples": [], "tags": []
    });
    assert!(level_from_value(&mistyped_order).is_none());
  }

  #[test]
  fn level_from_value_filters_malformed_samples_and_tags() {
    let value = json!({
      "id": "x", "order": 3, "tier": 2,
      "title": "t", "objective": "o", "hint": "h",
      "category": "no-such-category",
      "samples": [
        {"text": "ok", "shouldMatch": true},
        {"text": 42, "shouldMatch": true},
        {"shouldMatch": false},
        {"text": "with note", "shouldMatch": false, "note": "n"}
      ],
      "tags": ["a", 7, "b", null]
    });

    let level = level_from_value(&value).unwrap();
    assert_eq!(level.category, RegexCategory::Literal);
    assert_eq!(level.samples.len(), 2);
    assert_eq!(level.samples[1].note.as_deref(), Some("n"));
    assert_eq!(level.tags, vec!["a".to_string(), "b".to_string()]);
  }

  #[test]
  fn game_state_serializes_with_camel_case_schema() {
    let state = GameState {
      unlocked_level_ids: vec!["sprout-01".into()],
      solved_level_ids: vec![],
      level_ratings: HashMap::new(),
      level_inputs: HashMap::new(),
      unlocked_achievements: vec![UnlockRecord { id: "first-match".into(), unlocked_at: 7 }],
      custom_levels: vec![],
      invalid_attempts_since_solve: 0,
      solved_in_session_streak: 0,
      short_regex_wins: 0,
      no_backtracking_wins: 0,
      fast_wins: 0,
    };

    let value = serde_json::to_value(&state).unwrap();
    assert!(value.get("unlockedLevelIds").is_some());
    assert!(value.get("invalidAttemptsSinceSolve").is_some());
    assert_eq!(value["unlockedAchievements"][0]["unlockedAt"], 7);
  }
}
