//! Persisted game state: a single JSON record on disk.
//!
//! The loader never trusts the blob. Every field is independently
//! shape-checked; anything missing, mistyped or out of range falls back to
//! its default instead of rejecting the whole record, so a corrupt file can
//! degrade progress but never crash the session.
//!
//! Saves are fire-and-forget: a write failure is logged and swallowed.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use tracing::{error, info};

use crate::domain::{level_from_value, GameState, LevelInput, UnlockRecord};
use crate::levels::FIRST_LEVEL_ID;
use crate::progress::initial_state;

const DEFAULT_STATE_PATH: &str = "./realm-state.json";

pub struct Storage {
  path: PathBuf,
}

impl Storage {
  /// Storage at REALM_STATE_PATH, or `./realm-state.json` by default.
  pub fn from_env() -> Self {
    let path = std::env::var("REALM_STATE_PATH").unwrap_or_else(|_| DEFAULT_STATE_PATH.to_string());
    Storage { path: PathBuf::from(path) }
  }

  #[allow(dead_code)]
  pub fn at(path: impl Into<PathBuf>) -> Self {
    Storage { path: path.into() }
  }

  /// Load the persisted state, falling back to defaults field by field.
  pub fn load(&self) -> GameState {
    let raw = match fs::read_to_string(&self.path) {
      Ok(raw) => raw,
      Err(_) => return initial_state(),
    };

    match serde_json::from_str::<Value>(&raw) {
      Ok(value) => {
        info!(target: "realm_backend", path = %self.path.display(), "Loaded persisted game state");
        state_from_value(&value)
      }
      Err(e) => {
        error!(target: "realm_backend", path = %self.path.display(), error = %e, "Persisted state unparsable; starting fresh");
        initial_state()
      }
    }
  }

  /// Persist the whole aggregate. Called after every state change.
  pub fn save(&self, state: &GameState) {
    let json = match serde_json::to_string(state) {
      Ok(json) => json,
      Err(e) => {
        error!(target: "realm_backend", error = %e, "Failed to serialize game state");
        return;
      }
    };
    if let Err(e) = fs::write(&self.path, json) {
      error!(target: "realm_backend", path = %self.path.display(), error = %e, "Failed to persist game state");
    }
  }

  /// Clear persisted progress.
  pub fn reset(&self) {
    match fs::remove_file(&self.path) {
      Ok(()) => {}
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(e) => {
        error!(target: "realm_backend", path = %self.path.display(), error = %e, "Failed to clear persisted state");
      }
    }
  }
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
  value?.as_array().map(|items| {
    items
      .iter()
      .filter_map(Value::as_str)
      .map(str::to_string)
      .collect()
  })
}

fn counter(value: Option<&Value>) -> u32 {
  value
    .and_then(Value::as_u64)
    .map(|n| n.min(u64::from(u32::MAX)) as u32)
    .unwrap_or(0)
}

/// Keep the first record per achievement id; later duplicates are dropped so
/// the original unlock timestamp survives.
fn dedupe_unlocks(records: Vec<UnlockRecord>) -> Vec<UnlockRecord> {
  let mut unique: Vec<UnlockRecord> = Vec::with_capacity(records.len());
  for record in records {
    if !unique.iter().any(|existing| existing.id == record.id) {
      unique.push(record);
    }
  }
  unique
}

fn state_from_value(value: &Value) -> GameState {
  let obj = match value.as_object() {
    Some(obj) => obj,
    None => return initial_state(),
  };

  let unlocked_level_ids = string_list(obj.get("unlockedLevelIds"))
    .unwrap_or_else(|| vec![FIRST_LEVEL_ID.to_string()]);
  let solved_level_ids = string_list(obj.get("solvedLevelIds")).unwrap_or_default();

  let level_ratings: HashMap<String, u8> = obj
    .get("levelRatings")
    .and_then(Value::as_object)
    .map(|ratings| {
      ratings
        .iter()
        .filter_map(|(level_id, stars)| {
          let stars = stars.as_u64()?;
          (1..=3u64).contains(&stars).then(|| (level_id.clone(), stars as u8))
        })
        .collect()
    })
    .unwrap_or_default();

  let level_inputs: HashMap<String, LevelInput> = obj
    .get("levelInputs")
    .and_then(Value::as_object)
    .map(|inputs| {
      inputs
        .iter()
        .filter_map(|(level_id, payload)| {
          let payload = payload.as_object()?;
          Some((
            level_id.clone(),
            LevelInput {
              pattern: payload.get("pattern")?.as_str()?.to_string(),
              flags: payload.get("flags")?.as_str()?.to_string(),
            },
          ))
        })
        .collect()
    })
    .unwrap_or_default();

  let unlocked_achievements = obj
    .get("unlockedAchievements")
    .and_then(Value::as_array)
    .map(|records| {
      dedupe_unlocks(
        records
          .iter()
          .filter_map(|record| {
            let record = record.as_object()?;
            Some(UnlockRecord {
              id: record.get("id")?.as_str()?.to_string(),
              unlocked_at: record.get("unlockedAt")?.as_u64()?,
            })
          })
          .collect(),
      )
    })
    .unwrap_or_default();

  let custom_levels = obj
    .get("customLevels")
    .and_then(Value::as_array)
    .map(|levels| levels.iter().filter_map(level_from_value).collect())
    .unwrap_or_default();

  GameState {
    unlocked_level_ids,
    solved_level_ids,
    level_ratings,
    level_inputs,
    unlocked_achievements,
    custom_levels,
    invalid_attempts_since_solve: counter(obj.get("invalidAttemptsSinceSolve")),
    solved_in_session_streak: counter(obj.get("solvedInSessionStreak")),
    short_regex_wins: counter(obj.get("shortRegexWins")),
    no_backtracking_wins: counter(obj.get("noBacktrackingWins")),
    fast_wins: counter(obj.get("fastWins")),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use uuid::Uuid;

  fn scratch_storage() -> Storage {
    let path = std::env::temp_dir().join(format!("realm-state-{}.json", Uuid::new_v4()));
    Storage::at(path)
  }

  #[test]
  fn missing_file_loads_the_initial_state() {
    let storage = scratch_storage();
    assert_eq!(storage.load(), initial_state());
  }

  #[test]
  fn saved_state_round_trips() {
    let storage = scratch_storage();
    let mut state = initial_state();
    state.solved_level_ids.push("sprout-01".to_string());
    state.level_ratings.insert("sprout-01".to_string(), 3);
    state
      .level_inputs
      .insert("sprout-01".to_string(), LevelInput { pattern: "cat".into(), flags: "i".into() });
    state.unlocked_achievements.push(UnlockRecord { id: "first-match".into(), unlocked_at: 42 });
    state.fast_wins = 1;

    storage.save(&state);
    assert_eq!(storage.load(), state);
    storage.reset();
  }

  #[test]
  fn unparsable_blob_falls_back_to_initial_state() {
    let storage = scratch_storage();
    fs::write(storage.path.clone(), "{not json").unwrap();
    assert_eq!(storage.load(), initial_state());
    storage.reset();
  }

  #[test]
  fn each_field_is_validated_independently() {
    let storage = scratch_storage();
    let blob = json!({
      "unlockedLevelIds": "nope",
      "solvedLevelIds": ["sprout-01", 7, null],
      "levelRatings": {"sprout-01": 3, "sprout-02": 9, "sprout-03": "three"},
      "levelInputs": {
        "sprout-01": {"pattern": "cat", "flags": ""},
        "sprout-02": {"pattern": 4},
        "sprout-03": "text"
      },
      "unlockedAchievements": [
        {"id": "first-match", "unlockedAt": 10},
        {"id": "first-match", "unlockedAt": 99},
        {"id": "broken"},
        "junk"
      ],
      "customLevels": [
        {"id": "custom-1", "order": 33, "tier": 1, "title": "t",
         "objective": "o", "hint": "h", "category": "anchor",
         "samples": [{"text": "a", "shouldMatch": true}], "tags": []},
        {"id": "custom-2"}
      ],
      "invalidAttemptsSinceSolve": "lots",
      "fastWins": 2
    });
    fs::write(storage.path.clone(), blob.to_string()).unwrap();

    let state = storage.load();
    assert_eq!(state.unlocked_level_ids, vec![FIRST_LEVEL_ID.to_string()]);
    assert_eq!(state.solved_level_ids, vec!["sprout-01".to_string()]);
    assert_eq!(state.level_ratings.len(), 1);
    assert_eq!(state.level_ratings["sprout-01"], 3);
    assert_eq!(state.level_inputs.len(), 1);
    assert_eq!(state.unlocked_achievements.len(), 1);
    assert_eq!(state.unlocked_achievements[0].unlocked_at, 10);
    assert_eq!(state.custom_levels.len(), 1);
    assert_eq!(state.invalid_attempts_since_solve, 0);
    assert_eq!(state.fast_wins, 2);
    storage.reset();
  }

  #[test]
  fn reset_clears_the_record() {
    let storage = scratch_storage();
    storage.save(&initial_state());
    storage.reset();
    assert_eq!(storage.load(), initial_state());
    // Resetting again is harmless.
    storage.reset();
  }
}
