//! Progression state machine: unlocks, solves, streaks, counters, and the
//! achievement rule set.
//!
//! Every transition is a pure function from one `GameState` snapshot to the
//! next. Callers replace the whole value under their lock, so no partially
//! updated state is ever observable between the individual rule steps.

use crate::domain::{GameState, LevelDefinition, RegexCategory, UnlockRecord};
use crate::levels::FIRST_LEVEL_ID;
use crate::scoring;

/// Ids with this prefix identify community/custom levels.
pub const CUSTOM_LEVEL_ID_PREFIX: &str = "custom-";

const TIER_ACHIEVEMENTS: [(u8, &str); 4] = [
  (2, "apprentice-path"),
  (3, "scholar-path"),
  (4, "arcanist-path"),
  (5, "ascendant-path"),
];

/// Outcome of a successful solve transition, for the solved toast.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveSummary {
  pub level_id: String,
  pub stars: u8,
  /// The level the solve unlocked, when it was not already unlocked.
  pub unlocked_level_id: Option<String>,
}

/// Fresh progress: only the first level is reachable.
pub fn initial_state() -> GameState {
  GameState {
    unlocked_level_ids: vec![FIRST_LEVEL_ID.to_string()],
    solved_level_ids: Vec::new(),
    level_ratings: Default::default(),
    level_inputs: Default::default(),
    unlocked_achievements: Vec::new(),
    custom_levels: Vec::new(),
    invalid_attempts_since_solve: 0,
    solved_in_session_streak: 0,
    short_regex_wins: 0,
    no_backtracking_wins: 0,
    fast_wins: 0,
  }
}

/// The first level must always be reachable, whatever the stored blob said.
pub fn normalize_state(state: GameState) -> GameState {
  if state.unlocked_level_ids.iter().any(|id| id == FIRST_LEVEL_ID) {
    return state;
  }

  let mut unlocked = vec![FIRST_LEVEL_ID.to_string()];
  unlocked.extend(state.unlocked_level_ids);
  GameState { unlocked_level_ids: unlocked, ..state }
}

/// Catalog + custom levels in global play order.
pub fn combined_levels(core: &[LevelDefinition], custom: &[LevelDefinition]) -> Vec<LevelDefinition> {
  let mut levels: Vec<LevelDefinition> = core.iter().chain(custom.iter()).cloned().collect();
  levels.sort_by_key(|level| level.order);
  levels
}

fn dedupe(values: Vec<String>) -> Vec<String> {
  let mut unique = Vec::with_capacity(values.len());
  for value in values {
    if !unique.contains(&value) {
      unique.push(value);
    }
  }
  unique
}

/// Append an unlock record unless the id is already present. First-unlock
/// timestamps are never overwritten.
pub fn unlock_achievement(records: &[UnlockRecord], id: &str, now_ms: u64) -> Vec<UnlockRecord> {
  if records.iter().any(|record| record.id == id) {
    return records.to_vec();
  }

  let mut next = records.to_vec();
  next.push(UnlockRecord { id: id.to_string(), unlocked_at: now_ms });
  next
}

/// Re-evaluate the full achievement rule set against the current state and
/// the combined catalog. Each clause unlocks independently and at most once.
pub fn apply_rules(state: GameState, levels: &[LevelDefinition], now_ms: u64) -> GameState {
  let mut unlocked = state.unlocked_achievements.clone();
  let mut unlock = |id: &str| {
    unlocked = unlock_achievement(&unlocked, id, now_ms);
  };

  let solved_levels: Vec<&LevelDefinition> = levels
    .iter()
    .filter(|level| state.solved_level_ids.iter().any(|id| *id == level.id))
    .collect();

  if !solved_levels.is_empty() {
    unlock("first-match");
  }

  for (tier, achievement_id) in TIER_ACHIEVEMENTS {
    let reached = levels
      .iter()
      .any(|level| level.tier == tier && state.unlocked_level_ids.iter().any(|id| *id == level.id));
    if reached {
      unlock(achievement_id);
    }
  }

  if state.no_backtracking_wins >= 3 {
    unlock("no-backtracking");
  }
  if state.short_regex_wins >= 5 {
    unlock("one-liner-master");
  }
  if state.fast_wins >= 3 {
    unlock("speed-runner");
  }
  if state.solved_in_session_streak >= 3 {
    unlock("streak-keeper");
  }

  let solved_in = |category: RegexCategory| {
    solved_levels.iter().filter(|level| level.category == category).count()
  };
  if solved_in(RegexCategory::Lookaround) >= 3 {
    unlock("lookaround-wizard");
  }
  if solved_in(RegexCategory::Backreference) >= 3 {
    unlock("backreference-boss");
  }
  if solved_in(RegexCategory::Unicode) >= 3 {
    unlock("unicode-explorer");
  }

  if state
    .solved_level_ids
    .iter()
    .any(|id| id.starts_with(CUSTOM_LEVEL_ID_PREFIX))
  {
    unlock("custom-conqueror");
  }

  GameState { unlocked_achievements: unlocked, ..state }
}

/// A new, distinct parse error while input is present: count the attempt and
/// break the session streak. (Debouncing against the last-seen error is the
/// caller's job; this transition assumes the event is genuine.)
pub fn record_invalid_attempt(state: &GameState) -> GameState {
  GameState {
    invalid_attempts_since_solve: state.invalid_attempts_since_solve + 1,
    solved_in_session_streak: 0,
    ..state.clone()
  }
}

/// The central solve transition. Applies scoring, unlock-next, rating,
/// streak and win-counter updates, then re-runs the achievement rules, all
/// as one snapshot-to-snapshot step. Solving an already-solved level leaves
/// the state untouched.
pub fn apply_solve(
  state: &GameState,
  levels: &[LevelDefinition],
  level_id: &str,
  source: &str,
  elapsed_ms: u64,
  now_ms: u64,
) -> (GameState, Option<SolveSummary>) {
  if state.solved_level_ids.iter().any(|id| id == level_id) {
    return (state.clone(), None);
  }
  let Some(level) = levels.iter().find(|level| level.id == level_id) else {
    return (state.clone(), None);
  };

  let pattern_length = source.chars().count();
  let stars = scoring::stars(level.order, elapsed_ms, state.invalid_attempts_since_solve, pattern_length);

  let mut solved_level_ids = state.solved_level_ids.clone();
  solved_level_ids.push(level_id.to_string());
  let solved_level_ids = dedupe(solved_level_ids);

  // Unlock the next level in global order, unless this was the last one.
  let order: Vec<&str> = levels.iter().map(|level| level.id.as_str()).collect();
  let position = order.iter().position(|id| *id == level_id);
  let next_level_id = position
    .and_then(|index| order.get(index + 1))
    .map(|id| id.to_string());

  let mut unlocked_level_ids = state.unlocked_level_ids.clone();
  let just_unlocked = next_level_id
    .as_ref()
    .filter(|id| !unlocked_level_ids.iter().any(|u| u == *id))
    .cloned();
  if let Some(id) = &next_level_id {
    unlocked_level_ids.push(id.clone());
  }
  let unlocked_level_ids = dedupe(unlocked_level_ids);

  let mut level_ratings = state.level_ratings.clone();
  let existing = level_ratings.get(level_id).copied().unwrap_or(0);
  level_ratings.insert(level_id.to_string(), existing.max(stars));

  let streak = if state.invalid_attempts_since_solve == 0 {
    state.solved_in_session_streak + 1
  } else {
    1
  };

  let short_win = pattern_length > 0 && pattern_length <= scoring::SHORT_WIN_MAX_LEN;
  let no_backtracking_win = scoring::is_no_backtracking_pattern(source);
  let fast_win = elapsed_ms <= scoring::FAST_WIN_MS;

  let next = GameState {
    solved_level_ids,
    unlocked_level_ids,
    level_ratings,
    invalid_attempts_since_solve: 0,
    solved_in_session_streak: streak,
    short_regex_wins: state.short_regex_wins + u32::from(short_win),
    no_backtracking_wins: state.no_backtracking_wins + u32::from(no_backtracking_win),
    fast_wins: state.fast_wins + u32::from(fast_win),
    ..state.clone()
  };

  let next = apply_rules(next, levels, now_ms);
  let summary = SolveSummary {
    level_id: level_id.to_string(),
    stars,
    unlocked_level_id: just_unlocked,
  };

  (next, Some(summary))
}

/// A creation/import draft must carry at least two samples with both
/// polarities represented; otherwise the whole request is refused.
pub fn validate_custom_draft(draft: &LevelDefinition) -> Result<(), String> {
  if draft.samples.len() < 2 {
    return Err("A custom level needs at least 2 samples.".to_string());
  }
  let has_match = draft.samples.iter().any(|s| s.should_match);
  let has_no_match = draft.samples.iter().any(|s| !s.should_match);
  if !has_match || !has_no_match {
    return Err("A custom level needs both matching and non-matching samples.".to_string());
  }
  Ok(())
}

fn next_order(core: &[LevelDefinition], custom: &[LevelDefinition]) -> u32 {
  core
    .iter()
    .chain(custom.iter())
    .map(|level| level.order)
    .max()
    .unwrap_or(0)
    + 1
}

fn append_custom_level(
  state: &GameState,
  core: &[LevelDefinition],
  draft: LevelDefinition,
  id: String,
) -> (GameState, LevelDefinition) {
  let custom_level = LevelDefinition {
    id,
    order: next_order(core, &state.custom_levels),
    ..draft
  };

  let mut custom_levels = state.custom_levels.clone();
  custom_levels.push(custom_level.clone());

  let mut unlocked_level_ids = state.unlocked_level_ids.clone();
  unlocked_level_ids.push(custom_level.id.clone());

  let next = GameState {
    custom_levels,
    unlocked_level_ids: dedupe(unlocked_level_ids),
    ..state.clone()
  };
  (next, custom_level)
}

/// Editor path: append the draft as a new custom level, unlock it, and award
/// `level-architect` (the one achievement granted directly, not re-derived).
pub fn create_custom_level(
  state: &GameState,
  core: &[LevelDefinition],
  draft: LevelDefinition,
  id: String,
  now_ms: u64,
) -> Result<(GameState, LevelDefinition), String> {
  validate_custom_draft(&draft)?;

  let (next, custom_level) = append_custom_level(state, core, draft, id);
  let next = GameState {
    unlocked_achievements: unlock_achievement(&next.unlocked_achievements, "level-architect", now_ms),
    ..next
  };
  let levels = combined_levels(core, &next.custom_levels);
  let next = apply_rules(next, &levels, now_ms);
  Ok((next, custom_level))
}

/// Share-link path: like creation but without `level-architect`, and
/// importing a level already present (same title, objective and samples)
/// is a no-op.
pub fn import_custom_level(
  state: &GameState,
  core: &[LevelDefinition],
  draft: LevelDefinition,
  id: String,
  now_ms: u64,
) -> Result<Option<(GameState, LevelDefinition)>, String> {
  validate_custom_draft(&draft)?;

  let duplicate = state.custom_levels.iter().any(|level| {
    level.title == draft.title
      && level.objective == draft.objective
      && serde_json::to_string(&level.samples).ok() == serde_json::to_string(&draft.samples).ok()
  });
  if duplicate {
    return Ok(None);
  }

  let (next, custom_level) = append_custom_level(state, core, draft, id);
  let levels = combined_levels(core, &next.custom_levels);
  let next = apply_rules(next, &levels, now_ms);
  Ok(Some((next, custom_level)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{LevelSample, RegexCategory};
  use crate::levels::built_in_levels;

  fn draft(title: &str, samples: &[(&str, bool)]) -> LevelDefinition {
    LevelDefinition {
      id: String::new(),
      order: 0,
      tier: 1,
      title: title.into(),
      objective: "custom objective".into(),
      hint: "custom hint".into(),
      category: RegexCategory::Literal,
      starter_pattern: None,
      starter_flags: None,
      samples: samples
        .iter()
        .map(|(text, should_match)| LevelSample {
          text: (*text).into(),
          should_match: *should_match,
          note: None,
        })
        .collect(),
      tags: vec![],
    }
  }

  fn unlocked_ids(state: &GameState) -> Vec<&str> {
    state.unlocked_achievements.iter().map(|r| r.id.as_str()).collect()
  }

  #[test]
  fn initial_state_reaches_only_the_first_level() {
    let state = initial_state();
    assert_eq!(state.unlocked_level_ids, vec![FIRST_LEVEL_ID.to_string()]);
    assert!(state.solved_level_ids.is_empty());
    assert_eq!(state.invalid_attempts_since_solve, 0);
  }

  #[test]
  fn normalize_reinstates_the_first_level() {
    let mut state = initial_state();
    state.unlocked_level_ids = vec!["seeker-07".to_string()];
    let normalized = normalize_state(state);
    assert_eq!(normalized.unlocked_level_ids[0], FIRST_LEVEL_ID);
    assert_eq!(normalized.unlocked_level_ids.len(), 2);
  }

  #[test]
  fn invalid_attempt_counts_and_breaks_the_streak() {
    let mut state = initial_state();
    state.solved_in_session_streak = 2;
    let next = record_invalid_attempt(&state);
    assert_eq!(next.invalid_attempts_since_solve, 1);
    assert_eq!(next.solved_in_session_streak, 0);
  }

  #[test]
  fn clean_solve_awards_stars_and_unlocks_the_next_level() {
    let levels = built_in_levels();
    let state = initial_state();

    let (next, summary) = apply_solve(&state, &levels, "sprout-01", "cat", 5_000, 1_000);
    let summary = summary.unwrap();

    assert_eq!(summary.stars, 3);
    assert_eq!(summary.unlocked_level_id.as_deref(), Some("sprout-02"));
    assert!(next.solved_level_ids.contains(&"sprout-01".to_string()));
    assert!(next.unlocked_level_ids.contains(&"sprout-02".to_string()));
    assert_eq!(next.level_ratings["sprout-01"], 3);
    assert_eq!(next.solved_in_session_streak, 1);
    assert_eq!(next.invalid_attempts_since_solve, 0);
    // "cat": short, no dot repetition, fast.
    assert_eq!(next.short_regex_wins, 1);
    assert_eq!(next.no_backtracking_wins, 1);
    assert_eq!(next.fast_wins, 1);
    assert!(unlocked_ids(&next).contains(&"first-match"));
  }

  #[test]
  fn duplicate_solve_events_are_idempotent() {
    let levels = built_in_levels();
    let (solved, _) = apply_solve(&initial_state(), &levels, "sprout-01", "cat", 5_000, 1_000);
    let (again, summary) = apply_solve(&solved, &levels, "sprout-01", "cats", 99_000, 2_000);
    assert!(summary.is_none());
    assert_eq!(again, solved);
  }

  #[test]
  fn dirty_solve_resets_the_streak_to_one_and_drops_the_clean_star() {
    let levels = built_in_levels();
    let mut state = initial_state();
    state.invalid_attempts_since_solve = 2;
    state.solved_in_session_streak = 0;

    let (next, summary) = apply_solve(&state, &levels, "sprout-01", "cat", 5_000, 1_000);
    assert_eq!(summary.unwrap().stars, 2);
    assert_eq!(next.solved_in_session_streak, 1);
    assert_eq!(next.invalid_attempts_since_solve, 0);
  }

  #[test]
  fn ratings_never_regress() {
    let levels = built_in_levels();
    let (good, _) = apply_solve(&initial_state(), &levels, "sprout-01", "cat", 5_000, 1_000);
    assert_eq!(good.level_ratings["sprout-01"], 3);

    // Replay the level after a poor attempt: the stored rating keeps the max.
    let mut replay = good.clone();
    replay.solved_level_ids.clear();
    replay.invalid_attempts_since_solve = 4;
    let (after, summary) = apply_solve(&replay, &levels, "sprout-01", &"x".repeat(40), 400_000, 2_000);
    assert_eq!(summary.unwrap().stars, 1);
    assert_eq!(after.level_ratings["sprout-01"], 3);
  }

  #[test]
  fn solving_the_last_level_unlocks_nothing_new() {
    let levels = built_in_levels();
    let mut state = initial_state();
    state.unlocked_level_ids.push("ascendant-32".to_string());

    let before = state.unlocked_level_ids.len();
    let (next, summary) = apply_solve(&state, &levels, "ascendant-32", "user", 5_000, 1_000);
    assert_eq!(summary.unwrap().unlocked_level_id, None);
    assert_eq!(next.unlocked_level_ids.len(), before);
  }

  #[test]
  fn already_unlocked_next_level_is_not_reported_again() {
    let levels = built_in_levels();
    let mut state = initial_state();
    state.unlocked_level_ids.push("sprout-02".to_string());

    let (_, summary) = apply_solve(&state, &levels, "sprout-01", "cat", 5_000, 1_000);
    assert_eq!(summary.unwrap().unlocked_level_id, None);
  }

  #[test]
  fn unknown_level_is_a_no_op() {
    let levels = built_in_levels();
    let state = initial_state();
    let (next, summary) = apply_solve(&state, &levels, "missing", "cat", 0, 0);
    assert!(summary.is_none());
    assert_eq!(next, state);
  }

  #[test]
  fn streak_of_three_clean_solves_unlocks_streak_keeper() {
    let levels = built_in_levels();
    let mut state = initial_state();
    for (id, pattern) in [("sprout-01", "cat"), ("sprout-02", "^hello"), ("sprout-03", "world$")] {
      let (next, summary) = apply_solve(&state, &levels, id, pattern, 5_000, 1_000);
      assert!(summary.is_some());
      state = next;
    }
    assert_eq!(state.solved_in_session_streak, 3);
    assert!(unlocked_ids(&state).contains(&"streak-keeper"));
  }

  #[test]
  fn unlocking_a_tier_two_level_awards_the_tier_path() {
    let levels = built_in_levels();
    let mut state = initial_state();
    state.unlocked_level_ids.push("sprout-06".to_string());

    let (next, _) = apply_solve(&state, &levels, "sprout-06", r"\d+", 5_000, 1_000);
    assert!(next.unlocked_level_ids.contains(&"seeker-07".to_string()));
    assert!(unlocked_ids(&next).contains(&"apprentice-path"));
  }

  #[test]
  fn first_unlock_timestamps_never_change() {
    let levels = built_in_levels();
    let (state, _) = apply_solve(&initial_state(), &levels, "sprout-01", "cat", 5_000, 100);
    let first = state
      .unlocked_achievements
      .iter()
      .find(|r| r.id == "first-match")
      .unwrap()
      .unlocked_at;
    assert_eq!(first, 100);

    let later = apply_rules(state, &levels, 9_999);
    let still = later
      .unlocked_achievements
      .iter()
      .find(|r| r.id == "first-match")
      .unwrap()
      .unlocked_at;
    assert_eq!(still, 100);
  }

  #[test]
  fn category_mastery_rules_count_solved_levels() {
    let levels = built_in_levels();
    let mut state = initial_state();
    state.solved_level_ids = vec![
      "arcanist-19".to_string(),
      "arcanist-20".to_string(),
      "arcanist-21".to_string(),
    ];
    let state = apply_rules(state, &levels, 50);
    assert!(unlocked_ids(&state).contains(&"lookaround-wizard"));
    assert!(!unlocked_ids(&state).contains(&"backreference-boss"));
  }

  #[test]
  fn solving_a_custom_level_awards_custom_conqueror() {
    let levels = built_in_levels();
    let mut state = initial_state();
    state.solved_level_ids = vec!["custom-abc".to_string()];
    let state = apply_rules(state, &levels, 50);
    assert!(unlocked_ids(&state).contains(&"custom-conqueror"));
  }

  #[test]
  fn creating_a_custom_level_assigns_order_and_unlocks_it() {
    let core = built_in_levels();
    let state = initial_state();
    let draft = draft("Mine", &[("yes", true), ("no", false)]);

    let (next, created) =
      create_custom_level(&state, &core, draft, "custom-1".to_string(), 10).unwrap();
    assert_eq!(created.order, 33);
    assert!(next.unlocked_level_ids.contains(&"custom-1".to_string()));
    assert!(unlocked_ids(&next).contains(&"level-architect"));
  }

  #[test]
  fn under_specified_drafts_are_refused() {
    let core = built_in_levels();
    let state = initial_state();

    let one_sample = draft("One", &[("yes", true)]);
    assert!(create_custom_level(&state, &core, one_sample, "custom-1".into(), 0).is_err());

    let one_polarity = draft("Same", &[("a", true), ("b", true)]);
    assert!(create_custom_level(&state, &core, one_polarity, "custom-2".into(), 0).is_err());
  }

  #[test]
  fn importing_a_duplicate_is_a_no_op() {
    let core = built_in_levels();
    let state = initial_state();
    let payload = draft("Shared", &[("yes", true), ("no", false)]);

    let (with_level, _) =
      import_custom_level(&state, &core, payload.clone(), "custom-1".into(), 0)
        .unwrap()
        .unwrap();
    assert!(!unlocked_ids(&with_level).contains(&"level-architect"));

    let again = import_custom_level(&with_level, &core, payload, "custom-2".into(), 0).unwrap();
    assert!(again.is_none());
  }

  #[test]
  fn imported_levels_order_after_existing_customs() {
    let core = built_in_levels();
    let state = initial_state();
    let (state, first) = import_custom_level(
      &state, &core, draft("A", &[("y", true), ("n", false)]), "custom-1".into(), 0,
    )
    .unwrap()
    .unwrap();
    let (_, second) = import_custom_level(
      &state, &core, draft("B", &[("y", true), ("n", false)]), "custom-2".into(), 0,
    )
    .unwrap()
    .unwrap();
    assert_eq!(first.order, 33);
    assert_eq!(second.order, 34);
  }
}
