//! Regex core: pattern parsing, match-range scanning, level evaluation, and
//! the didactic step-by-step trace used by the debugger view.
//!
//! Matching itself is delegated to `regress`, an EcmaScript-syntax engine, so
//! learner patterns behave the way the lessons teach them (lookaround,
//! backreferences, named groups, `\u{...}` escapes, JS flag alphabet).
//!
//! All functions here are pure; errors surface as values inside
//! `RegexParseResult`, never as panics or Err returns.

use regress::{Flags, Regex};

use crate::domain::{LevelDefinition, LevelSample};
use crate::util::{floor_char_boundary, next_char_boundary};

/// The recognized flag alphabet. `g`, `y` and `d` do not affect compilation
/// (iteration is explicit in this engine) but are accepted as valid input.
const FLAG_ALPHABET: &str = "dgimsuvy";

/// Default step bound for `build_debug_steps`. Keeps the trace synchronous
/// and cheap even for pathological patterns on long text.
pub const DEFAULT_TRACE_CAP: usize = 42;

/// Result of parsing raw pattern/flags input. Recomputed on every keystroke.
///
/// An empty pattern is the "no input yet" state: no matcher, no error.
#[derive(Debug)]
pub struct RegexParseResult {
  pub matcher: Option<Regex>,
  pub source: String,
  pub flags: String,
  pub error: Option<String>,
}

/// Per-sample outcome of evaluating a level.
#[derive(Clone, Debug)]
pub struct SampleEvaluation {
  pub sample: LevelSample,
  pub matched: bool,
  pub correct: bool,
  pub ranges: Vec<(usize, usize)>,
}

#[derive(Clone, Debug)]
pub struct LevelEvaluation {
  pub solved: bool,
  pub rows: Vec<SampleEvaluation>,
}

/// One trace step of the anchored-scan debugger.
#[derive(Clone, Debug, serde::Serialize)]
pub struct DebugStep {
  pub index: usize,
  pub success: bool,
  pub range: Option<(usize, usize)>,
  pub excerpt: String,
}

/// Remove duplicate flag characters, preserving first-seen order.
fn dedupe_flags(flags: &str) -> String {
  let mut unique = String::new();
  for flag in flags.chars() {
    if !unique.contains(flag) {
      unique.push(flag);
    }
  }
  unique
}

/// Split `/body/flags` literal-regex notation. `\` escapes the next character
/// only. Returns None when the input is not a complete literal.
fn split_literal_notation(input: &str) -> Option<(&str, &str)> {
  if !input.starts_with('/') || input.len() < 2 {
    return None;
  }

  let mut escaped = false;
  for (i, ch) in input.char_indices().skip(1) {
    if escaped {
      escaped = false;
      continue;
    }
    match ch {
      '\\' => escaped = true,
      '/' => return Some((&input[1..i], &input[i + 1..])),
      _ => {}
    }
  }

  None
}

/// Parse raw pattern and flags text into a compiled matcher or a typed error.
///
/// Accepts `/body/flags` literal notation as a convenience; explicit flags
/// text, when non-empty, wins over flags recovered from the literal.
pub fn parse_pattern_input(raw_pattern: &str, raw_flags: &str) -> RegexParseResult {
  let pattern_text = raw_pattern.trim();
  let flags_text = raw_flags.trim();

  if pattern_text.is_empty() {
    return RegexParseResult {
      matcher: None,
      source: String::new(),
      flags: flags_text.to_string(),
      error: None,
    };
  }

  let literal = split_literal_notation(pattern_text);
  let source = literal.map_or(pattern_text, |(body, _)| body).to_string();
  let merged_flags = dedupe_flags(if !flags_text.is_empty() {
    flags_text
  } else {
    literal.map_or("", |(_, flags)| flags)
  });

  if merged_flags.chars().any(|flag| !FLAG_ALPHABET.contains(flag)) {
    return RegexParseResult {
      matcher: None,
      source,
      flags: merged_flags.clone(),
      error: Some(format!("Invalid flags: {}", merged_flags)),
    };
  }

  match Regex::with_flags(&source, Flags::from(merged_flags.as_str())) {
    Ok(matcher) => RegexParseResult {
      matcher: Some(matcher),
      source,
      flags: merged_flags,
      error: None,
    },
    Err(e) => RegexParseResult {
      matcher: None,
      source,
      flags: merged_flags,
      error: Some(e.to_string()),
    },
  }
}

/// All non-overlapping match spans as `[start, end)` byte ranges, scanning
/// left to right. An empty match advances the cursor by one character so the
/// scan always makes forward progress.
pub fn get_match_ranges(matcher: &Regex, text: &str) -> Vec<(usize, usize)> {
  let mut ranges = Vec::new();
  let mut cursor = 0usize;

  while cursor <= text.len() {
    let Some(m) = matcher.find_from(text, cursor).next() else {
      break;
    };
    let range = m.range();
    ranges.push((range.start, range.end));

    cursor = if range.end > range.start {
      range.end
    } else {
      next_char_boundary(text, range.end)
    };
  }

  ranges
}

/// Run a matcher against every sample of a level.
///
/// The engine keeps no search cursor, so a single compiled matcher serves both
/// the boolean test and the highlight scan without cross-sample bleed-through.
pub fn evaluate_level(level: &LevelDefinition, matcher: &Regex) -> LevelEvaluation {
  let rows: Vec<SampleEvaluation> = level
    .samples
    .iter()
    .map(|sample| {
      let matched = matcher.find(&sample.text).is_some();
      SampleEvaluation {
        matched,
        correct: matched == sample.should_match,
        ranges: if matched {
          get_match_ranges(matcher, &sample.text)
        } else {
          Vec::new()
        },
        sample: sample.clone(),
      }
    })
    .collect();

  LevelEvaluation {
    solved: rows.iter().all(|row| row.correct),
    rows,
  }
}

/// Simulate how an anchored engine attempts the pattern at each cursor
/// position, bounded by `cap` steps.
///
/// This is a teaching approximation, not an engine trace: at each position the
/// pattern is retried wrapped in `^(?:...)` against the remaining text. A
/// failure advances one character; a success advances past the match (at least
/// one character, so zero-width matches cannot stall the scan).
pub fn build_debug_steps(source: &str, flags: &str, text: &str, cap: usize) -> Vec<DebugStep> {
  let scan_flags: String = flags.chars().filter(|f| *f != 'g' && *f != 'y').collect();
  let anchored = format!("^(?:{})", source);
  let Ok(matcher) = Regex::with_flags(&anchored, Flags::from(scan_flags.as_str())) else {
    return Vec::new();
  };

  let mut steps = Vec::new();
  let mut cursor = 0usize;

  while cursor <= text.len() && steps.len() < cap {
    match matcher.find(&text[cursor..]) {
      Some(m) => {
        let size = m.range().end - m.range().start;
        let next = if size == 0 {
          next_char_boundary(text, cursor)
        } else {
          cursor + size
        };
        steps.push(DebugStep {
          index: cursor,
          success: true,
          range: Some((cursor, next.min(text.len()))),
          excerpt: excerpt(text, cursor.saturating_sub(2), cursor + size + 4),
        });
        cursor = next;
      }
      None => {
        steps.push(DebugStep {
          index: cursor,
          success: false,
          range: None,
          excerpt: excerpt(text, cursor.saturating_sub(2), cursor + 8),
        });
        cursor = next_char_boundary(text, cursor);
      }
    }
  }

  steps
}

/// Excerpt window over `text`, clamped to string bounds and char boundaries.
fn excerpt(text: &str, lo: usize, hi: usize) -> String {
  let lo = floor_char_boundary(text, lo);
  let hi = floor_char_boundary(text, hi.min(text.len())).max(lo);
  text[lo..hi].to_string()
}
