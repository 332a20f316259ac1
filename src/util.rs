//! Small utility helpers used across modules.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the unix epoch. All timestamps in the game state
/// (achievement unlocks, level-open times) use this clock.
pub fn now_millis() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}

/// Largest char boundary <= `index`, clamped to the string.
/// Excerpt windows are computed in raw byte offsets and must not split a
/// multi-byte character.
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
  if index >= s.len() {
    return s.len();
  }
  let mut i = index;
  while !s.is_char_boundary(i) {
    i -= 1;
  }
  i
}

/// Byte offset of the char boundary immediately after `index`.
/// This is the "advance by one code unit" move on UTF-8 text.
pub fn next_char_boundary(s: &str, index: usize) -> usize {
  if index >= s.len() {
    return s.len() + 1;
  }
  let mut i = index + 1;
  while i < s.len() && !s.is_char_boundary(i) {
    i += 1;
  }
  i
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge patterns or sample texts.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    s.to_string()
  } else {
    let cut = floor_char_boundary(s, max);
    format!("{}… ({} bytes total)", &s[..cut], s.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn boundaries_clamp_inside_multibyte_chars() {
    let s = "a東b";
    // "東" occupies bytes 1..4.
    assert_eq!(floor_char_boundary(s, 2), 1);
    assert_eq!(next_char_boundary(s, 1), 4);
    assert_eq!(next_char_boundary(s, 4), 5);
    assert_eq!(next_char_boundary(s, 5), 6);
  }

  #[test]
  fn truncation_keeps_short_strings_intact() {
    assert_eq!(trunc_for_log("abc", 10), "abc");
    assert!(trunc_for_log(&"x".repeat(50), 8).starts_with("xxxxxxxx…"));
  }
}
