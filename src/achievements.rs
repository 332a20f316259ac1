//! Static achievement catalog. Unlock conditions live in `progress.rs`;
//! this module only carries the display metadata.

use crate::domain::AchievementDefinition;

pub const ACHIEVEMENTS: [AchievementDefinition; 14] = [
  AchievementDefinition {
    id: "first-match",
    icon: "🎯",
    title: "First Match",
    description: "Solve your first level.",
  },
  AchievementDefinition {
    id: "apprentice-path",
    icon: "🗺️",
    title: "Tier Unlocked: Seeker",
    description: "Unlock tier 2.",
  },
  AchievementDefinition {
    id: "scholar-path",
    icon: "📘",
    title: "Tier Unlocked: Scholar",
    description: "Unlock tier 3.",
  },
  AchievementDefinition {
    id: "arcanist-path",
    icon: "🧪",
    title: "Tier Unlocked: Arcanist",
    description: "Unlock tier 4.",
  },
  AchievementDefinition {
    id: "ascendant-path",
    icon: "👑",
    title: "Tier Unlocked: Ascendant",
    description: "Unlock tier 5.",
  },
  AchievementDefinition {
    id: "no-backtracking",
    icon: "🛡️",
    title: "No Backtracking",
    description: "Win 3 levels without using dot-star patterns.",
  },
  AchievementDefinition {
    id: "one-liner-master",
    icon: "✍️",
    title: "One-liner Master",
    description: "Win 5 levels with pattern length <= 8.",
  },
  AchievementDefinition {
    id: "speed-runner",
    icon: "⚡",
    title: "Speed Runner",
    description: "Clear 3 levels in under 20 seconds each.",
  },
  AchievementDefinition {
    id: "lookaround-wizard",
    icon: "🔮",
    title: "Lookaround Wizard",
    description: "Solve 3 lookaround levels.",
  },
  AchievementDefinition {
    id: "backreference-boss",
    icon: "🧷",
    title: "Backreference Boss",
    description: "Solve 3 backreference levels.",
  },
  AchievementDefinition {
    id: "unicode-explorer",
    icon: "🌍",
    title: "Unicode Explorer",
    description: "Solve 3 unicode levels.",
  },
  AchievementDefinition {
    id: "streak-keeper",
    icon: "🔥",
    title: "Streak Keeper",
    description: "Solve 3 levels in a row without invalid regex errors.",
  },
  AchievementDefinition {
    id: "level-architect",
    icon: "🧱",
    title: "Level Architect",
    description: "Create a custom level in the editor.",
  },
  AchievementDefinition {
    id: "custom-conqueror",
    icon: "🚀",
    title: "Custom Conqueror",
    description: "Solve a custom community level.",
  },
];

/// Catalog lookup by id.
pub fn achievement_by_id(id: &str) -> Option<&'static AchievementDefinition> {
  ACHIEVEMENTS.iter().find(|a| a.id == id)
}
