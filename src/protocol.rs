//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::achievements::ACHIEVEMENTS;
use crate::domain::{
    AchievementDefinition, GameState, LevelDefinition, LevelInput, LevelSample, RegexCategory,
    TierDefinition,
};
use crate::engine::{DebugStep, SampleEvaluation};
use crate::levels::level_difficulty;
use crate::state::EvaluateOutcome;
use crate::tokens::DiagramToken;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    ListLevels,
    SelectLevel {
        #[serde(rename = "levelId")]
        level_id: String,
    },
    Evaluate {
        #[serde(rename = "levelId")]
        level_id: String,
        pattern: String,
        #[serde(default)]
        flags: String,
    },
    Tokenize {
        pattern: String,
    },
    Trace {
        pattern: String,
        #[serde(default)]
        flags: String,
        text: String,
        #[serde(default)]
        cap: Option<usize>,
    },
    CreateLevel {
        level: LevelDraftIn,
    },
    ImportLevel {
        fragment: String,
    },
    ShareLevel {
        #[serde(rename = "levelId")]
        level_id: String,
    },
    Progress,
    ResetProgress,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Levels {
        levels: Vec<LevelOut>,
        tiers: Vec<TierDefinition>,
    },
    LevelSelected {
        level: LevelOut,
        input: LevelInput,
    },
    Evaluation {
        evaluation: EvaluationOut,
    },
    Tokens {
        pattern: String,
        tokens: Vec<DiagramToken>,
    },
    Trace {
        steps: Vec<DebugStep>,
    },
    LevelCreated {
        level: LevelOut,
        #[serde(rename = "newAchievements")]
        new_achievements: Vec<AchievementOut>,
    },
    LevelImported {
        /// None when the share link pointed at a level already present.
        level: Option<LevelOut>,
        #[serde(rename = "newAchievements")]
        new_achievements: Vec<AchievementOut>,
    },
    ShareLink {
        fragment: String,
    },
    Progress {
        progress: ProgressOut,
    },
    ResetDone,
    Error {
        message: String,
    },
}

/// Level DTO enriched with per-player status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelOut {
    pub id: String,
    pub order: u32,
    pub tier: u8,
    pub title: String,
    pub objective: String,
    pub hint: String,
    pub category: RegexCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starter_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starter_flags: Option<String>,
    pub samples: Vec<LevelSample>,
    pub tags: Vec<String>,
    pub difficulty: u8,
    pub unlocked: bool,
    pub solved: bool,
    pub stars: u8,
}

/// Convert a level + current progress into the public DTO.
pub fn to_level_out(level: &LevelDefinition, state: &GameState) -> LevelOut {
    LevelOut {
        id: level.id.clone(),
        order: level.order,
        tier: level.tier,
        title: level.title.clone(),
        objective: level.objective.clone(),
        hint: level.hint.clone(),
        category: level.category,
        starter_pattern: level.starter_pattern.clone(),
        starter_flags: level.starter_flags.clone(),
        samples: level.samples.clone(),
        tags: level.tags.clone(),
        difficulty: level_difficulty(level.order),
        unlocked: state.unlocked_level_ids.iter().any(|id| *id == level.id),
        solved: state.solved_level_ids.iter().any(|id| *id == level.id),
        stars: state.level_ratings.get(&level.id).copied().unwrap_or(0),
    }
}

/// Per-sample evaluation row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleRowOut {
    pub text: String,
    pub should_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub matched: bool,
    pub correct: bool,
    pub ranges: Vec<(usize, usize)>,
}

fn to_row_out(row: SampleEvaluation) -> SampleRowOut {
    SampleRowOut {
        text: row.sample.text,
        should_match: row.sample.should_match,
        note: row.sample.note,
        matched: row.matched,
        correct: row.correct,
        ranges: row.ranges,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveOut {
    pub level_id: String,
    pub stars: u8,
    pub unlocked_level_id: Option<String>,
}

/// Everything the UI needs after one keystroke: the parse outcome, the
/// per-sample rows, and the solve toast when this submission cleared the
/// level.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOut {
    pub source: String,
    pub flags: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub solved: bool,
    pub rows: Vec<SampleRowOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solve: Option<SolveOut>,
    pub new_achievements: Vec<AchievementOut>,
}

pub fn to_evaluation_out(outcome: EvaluateOutcome) -> EvaluationOut {
    EvaluationOut {
        valid: outcome.error.is_none() && !outcome.source.is_empty(),
        source: outcome.source,
        flags: outcome.flags,
        error: outcome.error,
        solved: outcome.solved,
        rows: outcome.rows.into_iter().map(to_row_out).collect(),
        solve: outcome.solve.map(|s| SolveOut {
            level_id: s.level_id,
            stars: s.stars,
            unlocked_level_id: s.unlocked_level_id,
        }),
        new_achievements: outcome
            .new_achievements
            .into_iter()
            .map(|a| to_achievement_out(a, None))
            .collect(),
    }
}

/// Achievement catalog entry joined with its unlock record, if any.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementOut {
    pub id: &'static str,
    pub icon: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<u64>,
}

pub fn to_achievement_out(def: &'static AchievementDefinition, unlocked_at: Option<u64>) -> AchievementOut {
    AchievementOut {
        id: def.id,
        icon: def.icon,
        title: def.title,
        description: def.description,
        unlocked_at,
    }
}

/// Aggregate progress view for the header and the achievement panel.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOut {
    pub solved_count: usize,
    pub unlocked_count: usize,
    pub total_levels: usize,
    pub invalid_attempts_since_solve: u32,
    pub solved_in_session_streak: u32,
    pub short_regex_wins: u32,
    pub no_backtracking_wins: u32,
    pub fast_wins: u32,
    pub achievements: Vec<AchievementOut>,
}

pub fn to_progress_out(state: &GameState, total_levels: usize) -> ProgressOut {
    ProgressOut {
        solved_count: state.solved_level_ids.len(),
        unlocked_count: state.unlocked_level_ids.len(),
        total_levels,
        invalid_attempts_since_solve: state.invalid_attempts_since_solve,
        solved_in_session_streak: state.solved_in_session_streak,
        short_regex_wins: state.short_regex_wins,
        no_backtracking_wins: state.no_backtracking_wins,
        fast_wins: state.fast_wins,
        achievements: ACHIEVEMENTS
            .iter()
            .map(|def| {
                let unlocked_at = state
                    .unlocked_achievements
                    .iter()
                    .find(|record| record.id == def.id)
                    .map(|record| record.unlocked_at);
                to_achievement_out(def, unlocked_at)
            })
            .collect(),
    }
}

/// Draft accepted by the level editor and the creation endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDraftIn {
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
    pub samples: Vec<SampleIn>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleIn {
    pub text: String,
    pub should_match: bool,
    #[serde(default)]
    pub note: Option<String>,
}

impl LevelDraftIn {
    /// Id and order are assigned by the progression engine on append.
    pub fn into_draft(self) -> LevelDefinition {
        LevelDefinition {
            id: String::new(),
            order: 0,
            tier: self.tier.unwrap_or(1).clamp(1, 5),
            title: self.title,
            objective: self.objective,
            hint: self.hint,
            category: RegexCategory::parse_lossy(self.category.as_deref().unwrap_or("literal")),
            starter_pattern: self.starter_pattern,
            starter_flags: self.starter_flags,
            samples: self
                .samples
                .into_iter()
                .map(|s| LevelSample { text: s.text, should_match: s.should_match, note: s.note })
                .collect(),
            tags: self.tags,
        }
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Serialize)]
pub struct LevelsOut {
    pub levels: Vec<LevelOut>,
    pub tiers: Vec<TierDefinition>,
}

#[derive(Debug, Serialize)]
pub struct SelectedOut {
    pub level: LevelOut,
    pub input: LevelInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOut {
    pub level: LevelOut,
    pub new_achievements: Vec<AchievementOut>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOut {
    /// None when the share link pointed at a level already present.
    pub level: Option<LevelOut>,
    pub new_achievements: Vec<AchievementOut>,
}

#[derive(Debug, Deserialize)]
pub struct SelectQuery {
    #[serde(rename = "levelId")]
    pub level_id: String,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateIn {
    #[serde(rename = "levelId")]
    pub level_id: String,
    pub pattern: String,
    #[serde(default)]
    pub flags: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenizeIn {
    pub pattern: String,
}

#[derive(Debug, Serialize)]
pub struct TokensOut {
    pub pattern: String,
    pub tokens: Vec<DiagramToken>,
}

#[derive(Debug, Deserialize)]
pub struct TraceIn {
    pub pattern: String,
    #[serde(default)]
    pub flags: String,
    pub text: String,
    #[serde(default)]
    pub cap: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TraceOut {
    pub steps: Vec<DebugStep>,
}

#[derive(Debug, Deserialize)]
pub struct ImportIn {
    pub fragment: String,
}

#[derive(Debug, Deserialize)]
pub struct ShareQuery {
    #[serde(rename = "levelId")]
    pub level_id: String,
}

#[derive(Debug, Serialize)]
pub struct ShareOut {
    pub fragment: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
