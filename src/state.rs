//! Application state: level catalog, persisted progress, and per-session
//! bookkeeping.
//!
//! This module owns:
//!   - the core catalog (built-in levels + optional config bank)
//!   - the persisted `GameState` behind a RwLock
//!   - session data the rules need (level-open timestamps, last parse error)
//!
//! Every mutation follows the same shape: snapshot the current state, run a
//! pure transition from `progress`, replace the whole value, persist. No
//! reader can observe a half-applied transition.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::achievements::{achievement_by_id, ACHIEVEMENTS};
use crate::config::{bank_entry_to_level, load_realm_config_from_env};
use crate::domain::{AchievementDefinition, GameState, LevelDefinition, LevelInput};
use crate::engine::{evaluate_level, parse_pattern_input, SampleEvaluation};
use crate::levels::{
    built_in_levels, validate_built_in, validate_combined_orders, verify_starter_patterns,
};
use crate::progress::{self, SolveSummary, CUSTOM_LEVEL_ID_PREFIX};
use crate::share;
use crate::storage::Storage;
use crate::util::now_millis;

#[derive(Default)]
pub struct SessionState {
    pub level_opened_at: HashMap<String, u64>,
    pub last_seen_error: Option<String>,
}

pub struct AppState {
    pub core_levels: Vec<LevelDefinition>,
    pub game: RwLock<GameState>,
    pub session: RwLock<SessionState>,
    storage: Storage,
}

/// Everything one evaluation round produces: parse outcome, per-sample rows,
/// and, when this submission solved the level, the solve summary plus any
/// achievements it unlocked.
pub struct EvaluateOutcome {
    pub source: String,
    pub flags: String,
    pub error: Option<String>,
    pub rows: Vec<SampleEvaluation>,
    pub solved: bool,
    pub solve: Option<SolveSummary>,
    pub new_achievements: Vec<&'static AchievementDefinition>,
}

impl AppState {
    /// Build state from env: validate the built-in catalog, merge the optional
    /// TOML bank, load persisted progress.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Result<Self, String> {
        let mut core_levels = built_in_levels();
        validate_built_in(&core_levels)?;

        if let Some(cfg) = load_realm_config_from_env() {
            for entry in &cfg.levels {
                let order = core_levels.iter().map(|l| l.order).max().unwrap_or(0) + 1;
                let fallback_id = format!("bank-{}", Uuid::new_v4());
                match bank_entry_to_level(entry, order, fallback_id) {
                    Ok(level) => {
                        if level.starter_pattern.is_some() {
                            if let Err(e) = verify_starter_patterns(std::slice::from_ref(&level)) {
                                error!(target: "realm_backend", title = %entry.title, error = %e, "Skipping bank level: starter fails its samples");
                                continue;
                            }
                        }
                        info!(target: "realm_backend", id = %level.id, order = level.order, "Added config-bank level");
                        core_levels.push(level);
                    }
                    Err(e) => {
                        error!(target: "realm_backend", title = %entry.title, error = %e, "Skipping bank level");
                    }
                }
            }
        }

        let storage = Storage::from_env();
        let game = progress::normalize_state(storage.load());

        if let Err(e) = validate_combined_orders(&progress::combined_levels(&core_levels, &game.custom_levels)) {
            warn!(target: "realm_backend", error = %e, "Combined level orders are inconsistent; play order may look odd");
        }

        // Startup inventory by tier.
        let mut count_by_tier: HashMap<u8, usize> = HashMap::new();
        for level in &core_levels {
            *count_by_tier.entry(level.tier).or_insert(0) += 1;
        }
        for (tier, count) in count_by_tier {
            info!(target: "realm_backend", tier, count, "Startup level inventory");
        }
        info!(
            target: "progress",
            solved = game.solved_level_ids.len(),
            unlocked = game.unlocked_level_ids.len(),
            custom = game.custom_levels.len(),
            "Loaded progress"
        );

        Ok(Self {
            core_levels,
            game: RwLock::new(game),
            session: RwLock::new(SessionState::default()),
            storage,
        })
    }

    /// Core + custom levels in global play order.
    pub async fn levels(&self) -> Vec<LevelDefinition> {
        let game = self.game.read().await;
        progress::combined_levels(&self.core_levels, &game.custom_levels)
    }

    pub async fn level_by_id(&self, level_id: &str) -> Option<LevelDefinition> {
        self.levels().await.into_iter().find(|level| level.id == level_id)
    }

    pub async fn snapshot(&self) -> GameState {
        self.game.read().await.clone()
    }

    /// Mark a level opened (starts its solve clock) and return it together
    /// with the input to restore: the last-edited pattern/flags, or the
    /// starter seed on first visit.
    #[instrument(level = "info", skip(self), fields(%level_id))]
    pub async fn select_level(&self, level_id: &str) -> Option<(LevelDefinition, LevelInput)> {
        let level = self.level_by_id(level_id).await?;

        // Lock order is game, then session, everywhere in this module.
        let input = {
            let game = self.game.read().await;
            game.level_inputs.get(level_id).cloned().unwrap_or_else(|| LevelInput {
                pattern: level.starter_pattern.clone().unwrap_or_default(),
                flags: level.starter_flags.clone().unwrap_or_default(),
            })
        };

        self.session
            .write()
            .await
            .level_opened_at
            .insert(level_id.to_string(), now_millis());

        Some((level, input))
    }

    /// One evaluation round: parse the input, score it against the level's
    /// samples, track invalid attempts, and apply the solve transition when
    /// all samples pass for the first time.
    #[instrument(level = "info", skip(self, pattern, flags), fields(%level_id, pattern_len = pattern.len()))]
    pub async fn evaluate(&self, level_id: &str, pattern: &str, flags: &str) -> Option<EvaluateOutcome> {
        let level = self.level_by_id(level_id).await?;
        let parsed = parse_pattern_input(pattern, flags);
        let now = now_millis();

        let mut game = self.game.write().await;
        let mut session = self.session.write().await;
        let before = game.clone();
        let mut next = before.clone();

        // Remember the editor input for revisits.
        let input = LevelInput { pattern: pattern.to_string(), flags: flags.to_string() };
        if next.level_inputs.get(level_id) != Some(&input) {
            let mut level_inputs = next.level_inputs.clone();
            level_inputs.insert(level_id.to_string(), input);
            next = GameState { level_inputs, ..next };
        }

        // A new, distinct parse error while input is present counts as an
        // invalid attempt; repeats of the same error are debounced.
        let has_input = !pattern.trim().is_empty();
        if has_input && parsed.error.is_some() && session.last_seen_error != parsed.error {
            next = progress::record_invalid_attempt(&next);
        }
        session.last_seen_error = parsed.error.clone();

        let evaluation = parsed.matcher.as_ref().map(|matcher| evaluate_level(&level, matcher));
        let solved_now = evaluation.as_ref().map_or(false, |e| e.solved);

        let mut solve = None;
        if solved_now {
            let opened_at = *session
                .level_opened_at
                .entry(level_id.to_string())
                .or_insert(now);
            let elapsed_ms = now.saturating_sub(opened_at);
            let levels = progress::combined_levels(&self.core_levels, &next.custom_levels);
            let (after_solve, summary) =
                progress::apply_solve(&next, &levels, level_id, &parsed.source, elapsed_ms, now);
            next = after_solve;
            solve = summary;

            if let Some(summary) = &solve {
                info!(
                    target: "progress",
                    level = %summary.level_id,
                    stars = summary.stars,
                    unlocked = summary.unlocked_level_id.as_deref().unwrap_or("-"),
                    "Level solved"
                );
            }
        }

        let new_achievements = new_unlocks(&before, &next);
        if next != before {
            *game = next.clone();
            self.storage.save(&next);
        }

        Some(EvaluateOutcome {
            source: parsed.source,
            flags: parsed.flags,
            error: parsed.error,
            rows: evaluation.map(|e| e.rows).unwrap_or_default(),
            solved: solved_now,
            solve,
            new_achievements,
        })
    }

    /// Editor path: append a custom level, unlock it, award level-architect.
    #[instrument(level = "info", skip(self, draft), fields(title = %draft.title))]
    pub async fn create_level(
        &self,
        draft: LevelDefinition,
    ) -> Result<(LevelDefinition, Vec<&'static AchievementDefinition>), String> {
        let id = format!("{}{}", CUSTOM_LEVEL_ID_PREFIX, Uuid::new_v4());
        let now = now_millis();

        let mut game = self.game.write().await;
        let before = game.clone();
        let (next, level) = progress::create_custom_level(&before, &self.core_levels, draft, id, now)?;
        let new_achievements = new_unlocks(&before, &next);

        *game = next.clone();
        self.storage.save(&next);
        info!(target: "progress", id = %level.id, order = level.order, "Custom level created");
        Ok((level, new_achievements))
    }

    /// Share-link path: decode, validate, and append unless it is already
    /// present. `Ok(None)` means the level was a duplicate.
    #[instrument(level = "info", skip(self, fragment), fields(fragment_len = fragment.len()))]
    pub async fn import_level(
        &self,
        fragment: &str,
    ) -> Result<Option<(LevelDefinition, Vec<&'static AchievementDefinition>)>, String> {
        let Some(draft) = share::decode_level(fragment) else {
            return Err("Malformed share link.".to_string());
        };
        let id = format!("{}{}", CUSTOM_LEVEL_ID_PREFIX, Uuid::new_v4());
        let now = now_millis();

        let mut game = self.game.write().await;
        let before = game.clone();
        match progress::import_custom_level(&before, &self.core_levels, draft, id, now)? {
            Some((next, level)) => {
                let new_achievements = new_unlocks(&before, &next);
                *game = next.clone();
                self.storage.save(&next);
                info!(target: "progress", id = %level.id, order = level.order, "Custom level imported");
                Ok(Some((level, new_achievements)))
            }
            None => {
                info!(target: "progress", "Share link ignored: level already present");
                Ok(None)
            }
        }
    }

    /// Encode an existing level as a shareable fragment.
    #[instrument(level = "info", skip(self), fields(%level_id))]
    pub async fn share_level(&self, level_id: &str) -> Option<String> {
        let level = self.level_by_id(level_id).await?;
        Some(share::encode_level(&level))
    }

    /// Wholesale progress reset, in memory and on disk.
    #[instrument(level = "info", skip(self))]
    pub async fn reset(&self) -> GameState {
        let fresh = progress::initial_state();

        let mut game = self.game.write().await;
        let mut session = self.session.write().await;
        *game = fresh.clone();
        session.level_opened_at.clear();
        session.last_seen_error = None;

        self.storage.reset();
        info!(target: "progress", "Progress reset to initial state");
        fresh
    }

    pub fn achievements(&self) -> &'static [AchievementDefinition] {
        &ACHIEVEMENTS
    }
}

/// Achievement definitions whose ids appear in `after` but not in `before`.
fn new_unlocks(before: &GameState, after: &GameState) -> Vec<&'static AchievementDefinition> {
    after
        .unlocked_achievements
        .iter()
        .filter(|record| !before.unlocked_achievements.iter().any(|b| b.id == record.id))
        .filter_map(|record| achievement_by_id(&record.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LevelSample, RegexCategory};

    fn scratch_app() -> AppState {
        let path = std::env::temp_dir().join(format!("realm-app-{}.json", Uuid::new_v4()));
        AppState {
            core_levels: built_in_levels(),
            game: RwLock::new(progress::initial_state()),
            session: RwLock::new(SessionState::default()),
            storage: Storage::at(path),
        }
    }

    fn custom_draft() -> LevelDefinition {
        LevelDefinition {
            id: String::new(),
            order: 0,
            tier: 1,
            title: "Scratch".into(),
            objective: "Match the scratch word.".into(),
            hint: "Type it out.".into(),
            category: RegexCategory::Literal,
            starter_pattern: None,
            starter_flags: None,
            samples: vec![
                LevelSample { text: "scratch".to_string(), should_match: true, note: None },
                LevelSample { text: "polish".to_string(), should_match: false, note: None },
            ],
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn evaluation_solves_and_persists_in_one_step() {
        let app = scratch_app();
        let outcome = app.evaluate("sprout-01", "cat", "").await.unwrap();
        assert!(outcome.solved);
        let summary = outcome.solve.unwrap();
        assert_eq!(summary.unlocked_level_id.as_deref(), Some("sprout-02"));
        assert!(outcome.new_achievements.iter().any(|a| a.id == "first-match"));

        let snapshot = app.snapshot().await;
        assert!(snapshot.solved_level_ids.contains(&"sprout-01".to_string()));
        app.reset().await;
    }

    #[tokio::test]
    async fn repeated_identical_errors_count_once() {
        let app = scratch_app();

        let first = app.evaluate("sprout-01", "(", "").await.unwrap();
        assert!(first.error.is_some());
        assert_eq!(app.snapshot().await.invalid_attempts_since_solve, 1);

        // Same broken pattern again: debounced.
        app.evaluate("sprout-01", "(", "").await.unwrap();
        assert_eq!(app.snapshot().await.invalid_attempts_since_solve, 1);

        // A different error counts again.
        app.evaluate("sprout-01", "a{", "gx").await.unwrap();
        assert_eq!(app.snapshot().await.invalid_attempts_since_solve, 2);
        app.reset().await;
    }

    #[tokio::test]
    async fn empty_input_never_counts_as_invalid() {
        let app = scratch_app();
        let outcome = app.evaluate("sprout-01", "", "").await.unwrap();
        assert!(outcome.error.is_none());
        assert!(!outcome.solved);
        assert_eq!(app.snapshot().await.invalid_attempts_since_solve, 0);
        app.reset().await;
    }

    #[tokio::test]
    async fn select_restores_saved_input_over_the_starter() {
        let app = scratch_app();
        let (_, starter) = app.select_level("sprout-01").await.unwrap();
        assert_eq!(starter.pattern, "cat");

        app.evaluate("sprout-01", "ca?t", "i").await.unwrap();
        let (_, restored) = app.select_level("sprout-01").await.unwrap();
        assert_eq!(restored.pattern, "ca?t");
        assert_eq!(restored.flags, "i");
        app.reset().await;
    }

    #[tokio::test]
    async fn created_levels_join_the_catalog_and_can_be_shared() {
        let app = scratch_app();
        let (level, achievements) = app.create_level(custom_draft()).await.unwrap();
        assert!(level.id.starts_with(CUSTOM_LEVEL_ID_PREFIX));
        assert_eq!(level.order, 33);
        assert!(achievements.iter().any(|a| a.id == "level-architect"));

        let fragment = app.share_level(&level.id).await.unwrap();
        let reimport = app.import_level(&fragment).await.unwrap();
        assert!(reimport.is_none(), "re-importing an existing level is a no-op");
        app.reset().await;
    }

    #[tokio::test]
    async fn import_rejects_malformed_fragments() {
        let app = scratch_app();
        assert!(app.import_level("custom=garbage").await.is_err());
        app.reset().await;
    }

    #[tokio::test]
    async fn reset_returns_to_the_initial_state() {
        let app = scratch_app();
        app.evaluate("sprout-01", "cat", "").await.unwrap();
        let fresh = app.reset().await;
        assert_eq!(fresh, progress::initial_state());
        assert_eq!(app.snapshot().await, progress::initial_state());
    }
}
