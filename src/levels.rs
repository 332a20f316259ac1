//! Built-in level catalog and catalog validation.
//!
//! Five tiers, 32 levels, difficulty ramping from bare literals to unicode
//! property escapes. Custom and config-bank levels append after these.

use crate::domain::{LevelDefinition, LevelSample, RegexCategory, TierDefinition};
use crate::engine::parse_pattern_input;

pub const FIRST_LEVEL_ID: &str = "sprout-01";

pub const TIERS: [TierDefinition; 5] = [
  TierDefinition { tier: 1, name: "Sprout", subtitle: "Literal and anchors", accent: "from-emerald-400 to-teal-400" },
  TierDefinition { tier: 2, name: "Seeker", subtitle: "Classes and quantifiers", accent: "from-cyan-400 to-sky-500" },
  TierDefinition { tier: 3, name: "Scholar", subtitle: "Groups and alternation", accent: "from-indigo-400 to-blue-500" },
  TierDefinition { tier: 4, name: "Arcanist", subtitle: "Lookarounds and backrefs", accent: "from-fuchsia-400 to-pink-500" },
  TierDefinition { tier: 5, name: "Ascendant", subtitle: "Unicode and advanced flow", accent: "from-amber-400 to-orange-500" },
];

/// Coarse 1-10 difficulty derived from global order.
pub fn level_difficulty(order: u32) -> u8 {
  order.div_ceil(4).clamp(1, 10) as u8
}

#[allow(clippy::too_many_arguments)]
fn level(
  id: &str,
  order: u32,
  tier: u8,
  title: &str,
  objective: &str,
  hint: &str,
  category: RegexCategory,
  starter_pattern: &str,
  starter_flags: &str,
  samples: &[(&str, bool)],
  tags: &[&str],
) -> LevelDefinition {
  LevelDefinition {
    id: id.into(),
    order,
    tier,
    title: title.into(),
    objective: objective.into(),
    hint: hint.into(),
    category,
    starter_pattern: Some(starter_pattern.into()),
    starter_flags: if starter_flags.is_empty() { None } else { Some(starter_flags.into()) },
    samples: samples
      .iter()
      .map(|(text, should_match)| LevelSample {
        text: (*text).into(),
        should_match: *should_match,
        note: None,
      })
      .collect(),
    tags: tags.iter().map(|t| (*t).into()).collect(),
  }
}

/// The immutable built-in progression, defined at process start.
pub fn built_in_levels() -> Vec<LevelDefinition> {
  use RegexCategory::*;
  vec![
    level(
      "sprout-01", 1, 1, "Literal Spark",
      "Match the word \"cat\" anywhere in the string.",
      "Start with the simplest possible literal.",
      Literal, "cat", "",
      &[("cat", true), ("concatenate", true), ("dog", false)],
      &["literal"],
    ),
    level(
      "sprout-02", 2, 1, "Start Sentinel",
      "Match \"hello\" only when it appears at the beginning.",
      "Use the start anchor.",
      Anchor, "^hello", "",
      &[("hello there", true), ("well hello", false), ("hello", true)],
      &["anchor"],
    ),
    level(
      "sprout-03", 3, 1, "End Sentinel",
      "Match \"world\" only at the end of the string.",
      "Use the end anchor.",
      Anchor, "world$", "",
      &[("hello world", true), ("worldwide", false), ("my world", true)],
      &["anchor"],
    ),
    level(
      "sprout-04", 4, 1, "Dot Hopper",
      "Match three-letter words shaped like c?t.",
      "Dot matches any single character except line breaks.",
      Literal, "c.t", "",
      &[("cat", true), ("cot", true), ("cart", false)],
      &["dot"],
    ),
    level(
      "sprout-05", 5, 1, "Vowel Radar",
      "Match any vowel character.",
      "Use a character class.",
      CharacterClass, "[aeiou]", "",
      &[("sky", false), ("apple", true), ("rhythm", false)],
      &["class"],
    ),
    level(
      "sprout-06", 6, 1, "Digit Beacon",
      "Match one or more digits.",
      "Use \\d with a quantifier.",
      Quantifier, r"\d+", "",
      &[("Room 42", true), ("No digits", false), ("007", true)],
      &["digit", "quantifier"],
    ),
    level(
      "seeker-07", 7, 2, "Optional Armour",
      "Match both \"color\" and \"colour\".",
      "Use ? for optional letters.",
      Quantifier, "colou?r", "",
      &[("color", true), ("colour", true), ("colouur", false)],
      &["optional"],
    ),
    level(
      "seeker-08", 8, 2, "Triple Key",
      "Match exactly three lowercase letters.",
      "Use {3}.",
      Quantifier, "^[a-z]{3}$", "",
      &[("abc", true), ("ab", false), ("abcd", false)],
      &["range", "quantifier"],
    ),
    level(
      "seeker-09", 9, 2, "Access Code",
      "Match codes like AB12 (2 uppercase letters + 2 digits).",
      "Combine classes with exact counts.",
      CharacterClass, r"^[A-Z]{2}\d{2}$", "",
      &[("AB12", true), ("ab12", false), ("ABC1", false)],
      &["class", "quantifier"],
    ),
    level(
      "seeker-10", 10, 2, "Word Boundary Runes",
      "Match whole words that are exactly 4 letters.",
      "Use \\b and \\w with a fixed quantifier.",
      Anchor, r"\b\w{4}\b", "",
      &[("blue", true), ("blues", false), ("go to mars", true)],
      &["boundary"],
    ),
    level(
      "seeker-11", 11, 2, "Consonant Core",
      "Match strings made only of consonants (no spaces).",
      "Negated classes are useful.",
      CharacterClass, r"^[^aeiou\s]+$", "",
      &[("rhythm", true), ("team", false), ("sky", true)],
      &["negated-class"],
    ),
    level(
      "seeker-12", 12, 2, "Whitespace Pulse",
      "Match one or more whitespace characters.",
      "Use \\s+ to consume runs of spaces/tabs/newlines.",
      Quantifier, r"\s+", "",
      &[("a b", true), ("tabs\tand spaces", true), ("nospace", false)],
      &["whitespace"],
    ),
    level(
      "scholar-13", 13, 3, "Creature Choice",
      "Match either cat or dog.",
      "Alternation uses | inside groups.",
      Group, "^(cat|dog)$", "",
      &[("cat", true), ("dog", true), ("cow", false)],
      &["alternation"],
    ),
    level(
      "scholar-14", 14, 3, "Decision Engine",
      "Match exactly yes, no, or maybe.",
      "Anchor the expression around your group.",
      Group, "^(yes|no|maybe)$", "",
      &[("yes", true), ("no", true), ("not sure", false)],
      &["alternation", "anchors"],
    ),
    level(
      "scholar-15", 15, 3, "Date Sigil",
      "Match dates in DD/MM/YYYY format.",
      "Use grouped numeric chunks.",
      Group, r"^(\d{2})/(\d{2})/(\d{4})$", "",
      &[("31/12/2025", true), ("1/12/2025", false), ("31-12-2025", false)],
      &["capture-group"],
    ),
    level(
      "scholar-16", 16, 3, "Laugh Loop",
      "Match exactly three repeats of \"ha\".",
      "A non-capturing group keeps the pattern clean.",
      Group, "^(?:ha){3}$", "",
      &[("hahaha", true), ("haha", false), ("hahahaha", false)],
      &["non-capturing-group"],
    ),
    level(
      "scholar-17", 17, 3, "Honorific Parser",
      "Match titles like \"Dr. Ada\" or \"Ms. Lin\".",
      "Group the valid titles and follow with a name.",
      Group, r"^(Mr|Ms|Dr)\.\s[A-Z][a-z]+$", "",
      &[("Dr. Ada", true), ("Mx. Ada", false), ("Ms Lin", false)],
      &["group", "class"],
    ),
    level(
      "scholar-18", 18, 3, "Named Channel",
      "Match phone fragments like 415-7788 using named groups.",
      "The engine supports (?<name>...).",
      Group, r"^(?<area>\d{3})-(?<line>\d{4})$", "",
      &[("415-7788", true), ("41-7788", false), ("4157788", false)],
      &["named-group"],
    ),
    level(
      "arcanist-19", 19, 4, "Colon Oracle",
      "Match the word immediately before a colon.",
      "Positive lookahead keeps the colon out of the match.",
      Lookaround, r"\w+(?=:)", "",
      &[("token:123", true), ("token-123", false), ("id:value", true)],
      &["lookahead"],
    ),
    level(
      "arcanist-20", 20, 4, "Forbidden Tail",
      "Match \"foo\" only when it is not followed by \"bar\".",
      "Negative lookahead is your shield.",
      Lookaround, "foo(?!bar)", "",
      &[("foozap", true), ("foobar", false), ("xfoo", true)],
      &["negative-lookahead"],
    ),
    level(
      "arcanist-21", 21, 4, "Hash Reveal",
      "Match words that come right after #.",
      "Use positive lookbehind.",
      Lookaround, r"(?<=#)\w+", "",
      &[("#release", true), ("release", false), ("tag #v2", true)],
      &["lookbehind"],
    ),
    level(
      "arcanist-22", 22, 4, "Free Price Filter",
      "Match numbers not immediately prefixed with $.",
      "Negative lookbehind can exclude currency values.",
      Lookaround, r"(?<!\$)\b\d+\b", "",
      &[("count 42", true), ("price $42", false), ("42 and $5", true)],
      &["negative-lookbehind"],
    ),
    level(
      "arcanist-23", 23, 4, "Echo Word",
      "Match duplicated consecutive words.",
      "Capture once, then reuse with \\1.",
      Backreference, r"\b(\w+)\s+\1\b", "",
      &[("go go now", true), ("go now", false), ("yes yes", true)],
      &["backreference"],
    ),
    level(
      "arcanist-24", 24, 4, "Balanced Tag",
      "Match simple opening/closing tags with same name.",
      "Backreference the tag name in the closing token.",
      Backreference, r"^<(\w+)>[^<]+</\1>$", "",
      &[("<b>bold</b>", true), ("<b>bold</i>", false), ("<tag>x</tag>", true)],
      &["backreference", "group"],
    ),
    level(
      "arcanist-25", 25, 4, "Admin Key",
      "Match passwords with at least one uppercase and one digit, length >= 6.",
      "Combine multiple lookaheads, then validate the whole string.",
      Lookaround, r"^(?=.*[A-Z])(?=.*\d)[A-Za-z\d]{6,}$", "",
      &[("Alpha9", true), ("alpha9", false), ("ALPHA", false)],
      &["lookahead", "quantifier"],
    ),
    level(
      "ascendant-26", 26, 5, "Letter Universe",
      "Match words built only from Latin letters, accented ones included.",
      "Extend a class beyond ASCII: [A-Za-zÀ-ÿ].",
      Unicode, r"^[A-Za-zÀ-ÿ]+$", "u",
      &[("Cafe", true), ("Café", true), ("abc123", false)],
      &["unicode-class"],
    ),
    level(
      "ascendant-27", 27, 5, "Han Script Gate",
      "Match text made only of Han-block characters.",
      "The core Han block spans \\u4e00-\\u9fff.",
      Unicode, r"^[一-鿿]+$", "u",
      &[("漢字", true), ("東京A", false), ("Kanaかな", false)],
      &["unicode-block"],
    ),
    level(
      "ascendant-28", 28, 5, "Emoji Pulse",
      "Detect at least one emoji in a string.",
      "Code point escapes \\u{...} need the u flag.",
      Unicode, r"[\u{1F300}-\u{1FAFF}]", "u",
      &[("Ship it 🚀", true), ("No emoji here", false), ("🔥fire", true)],
      &["emoji", "unicode"],
    ),
    level(
      "ascendant-29", 29, 5, "Currency Glyph",
      "Match currency symbol followed by digits.",
      "Currency symbols can sit in a character class like any letter.",
      Unicode, r"^[$€£¥]\d+$", "u",
      &[("$99", true), ("€150", true), ("USD100", false)],
      &["unicode-currency"],
    ),
    level(
      "ascendant-30", 30, 5, "Error Scanner",
      "Match lines that start with ERROR: in a multiline log.",
      "Anchors + m flag allow per-line matching.",
      Anchor, "^ERROR:.*$", "m",
      &[
        ("INFO: ok\nERROR: failed\nWARN: retry", true),
        ("INFO: ok\nWARN: retry", false),
        ("ERROR: single line", true),
      ],
      &["multiline"],
    ),
    level(
      "ascendant-31", 31, 5, "Mirror Link",
      "Match repeated word joined by - or _, using named backreference.",
      "Capture word and separator, then reference the named word.",
      Backreference, r"^(?<word>\w+)([-_])\k<word>$", "",
      &[("echo-echo", true), ("echo_echo", true), ("echo-echoo", false)],
      &["named-backreference"],
    ),
    level(
      "ascendant-32", 32, 5, "Role Extractor",
      "Match username in query fragments like user=neo&role=admin only for admins.",
      "Lookbehind + lookahead can isolate exactly the desired segment.",
      Lookaround, r"(?<=\buser=)\w+(?=&role=admin\b)", "",
      &[
        ("user=neo&role=admin", true),
        ("user=neo&role=guest", false),
        ("x=1&user=trinity&role=admin&y=2", true),
      ],
      &["lookbehind", "lookahead"],
    ),
  ]
}

/// Structural validation of the built-in progression. Runs at startup and
/// refuses to serve a broken catalog.
pub fn validate_built_in(levels: &[LevelDefinition]) -> Result<(), String> {
  if levels.len() < 30 {
    return Err(format!("Expected at least 30 core levels, found {}.", levels.len()));
  }

  let mut ordered: Vec<&LevelDefinition> = levels.iter().collect();
  ordered.sort_by_key(|l| l.order);

  let mut previous_difficulty = 0u8;
  for (index, level) in ordered.iter().enumerate() {
    let expected_order = index as u32 + 1;
    if level.order != expected_order {
      return Err(format!(
        "Level order gap detected at {}. Expected order {}.",
        level.id, expected_order
      ));
    }

    if level.objective.trim().chars().count() < 10 || level.hint.trim().chars().count() < 6 {
      return Err(format!("Level {} must include a clear objective and hint.", level.id));
    }

    if level.samples.len() < 3 {
      return Err(format!("Level {} must have at least 3 samples.", level.id));
    }

    let has_match = level.samples.iter().any(|s| s.should_match);
    let has_no_match = level.samples.iter().any(|s| !s.should_match);
    if !has_match || !has_no_match {
      return Err(format!("Level {} must include positive and negative samples.", level.id));
    }

    if level.starter_pattern.as_deref().map_or(true, |p| p.trim().is_empty()) {
      return Err(format!("Level {} is missing a starterPattern.", level.id));
    }

    let difficulty = level_difficulty(level.order);
    if difficulty < previous_difficulty {
      return Err(format!("Difficulty curve regressed at {}.", level.id));
    }
    previous_difficulty = difficulty;
  }

  Ok(())
}

/// Orders across the combined built-in + custom set must form a contiguous
/// 1..=n sequence with no duplicates.
pub fn validate_combined_orders(levels: &[LevelDefinition]) -> Result<(), String> {
  let mut orders: Vec<u32> = levels.iter().map(|l| l.order).collect();
  orders.sort_unstable();
  for (index, order) in orders.iter().enumerate() {
    let expected = index as u32 + 1;
    if *order != expected {
      return Err(format!(
        "Combined level orders are not contiguous: expected {}, found {}.",
        expected, order
      ));
    }
  }
  Ok(())
}

/// Verify each level's starter pattern compiles (flags minus `g`/`y`) and
/// satisfies its own samples. Separate from the structural pass so a host
/// engine feature gap shows up in tests, not as a refused boot.
pub fn verify_starter_patterns(levels: &[LevelDefinition]) -> Result<(), String> {
  for level in levels {
    let starter = level.starter_pattern.as_deref().unwrap_or_default();
    let safe_flags: String = level
      .starter_flags
      .as_deref()
      .unwrap_or_default()
      .chars()
      .filter(|f| *f != 'g' && *f != 'y')
      .collect();

    let parsed = parse_pattern_input(starter, &safe_flags);
    let Some(matcher) = parsed.matcher else {
      return Err(format!(
        "Starter regex for {} does not compile: {}",
        level.id,
        parsed.error.unwrap_or_default()
      ));
    };

    for sample in &level.samples {
      let matched = matcher.find(&sample.text).is_some();
      if matched != sample.should_match {
        return Err(format!("Starter regex for {} fails sample \"{}\".", level.id, sample.text));
      }
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn built_in_catalog_is_structurally_valid() {
    let levels = built_in_levels();
    validate_built_in(&levels).unwrap();
    validate_combined_orders(&levels).unwrap();
    assert_eq!(levels[0].id, FIRST_LEVEL_ID);
  }

  #[test]
  fn starter_patterns_solve_their_own_samples() {
    verify_starter_patterns(&built_in_levels()).unwrap();
  }

  #[test]
  fn difficulty_ramps_with_order() {
    assert_eq!(level_difficulty(1), 1);
    assert_eq!(level_difficulty(4), 1);
    assert_eq!(level_difficulty(5), 2);
    assert_eq!(level_difficulty(32), 8);
    assert_eq!(level_difficulty(100), 10);
  }

  #[test]
  fn combined_order_validation_spots_gaps_and_duplicates() {
    let mut levels = built_in_levels();
    levels[3].order = 40;
    assert!(validate_combined_orders(&levels).is_err());

    let mut dup = built_in_levels();
    dup[3].order = 5;
    assert!(validate_combined_orders(&dup).is_err());
  }
}
