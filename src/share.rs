//! Share-link codec for community levels.
//!
//! A level travels as a URL-fragment parameter `custom=<base64url(JSON)>`.
//! Decoding validates the payload field by field and returns `None` on any
//! malformation; it never throws corrupt external data at the caller.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

use crate::domain::{level_from_value, LevelDefinition};

const HASH_KEY: &str = "custom";

/// Encode a level into a shareable fragment: `custom=<base64url>`.
pub fn encode_level(level: &LevelDefinition) -> String {
  let json = serde_json::to_string(level).unwrap_or_else(|_| "{}".to_string());
  format!("{}={}", HASH_KEY, URL_SAFE_NO_PAD.encode(json))
}

/// Decode a shared fragment back into a level.
///
/// Accepts an optional leading `#` and other `&`-separated parameters around
/// the `custom` key. Unknown categories normalize to `literal`; malformed
/// sample/tag entries are dropped; missing or mistyped core fields reject the
/// whole payload.
pub fn decode_level(fragment: &str) -> Option<LevelDefinition> {
  let clean = fragment.strip_prefix('#').unwrap_or(fragment);
  let encoded = clean
    .split('&')
    .find_map(|param| param.strip_prefix(HASH_KEY).and_then(|rest| rest.strip_prefix('=')))?;

  // Tolerate padded variants of the url-safe alphabet.
  let bytes = URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('=')).ok()?;
  let raw = String::from_utf8(bytes).ok()?;
  let value: Value = serde_json::from_str(&raw).ok()?;
  level_from_value(&value)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{LevelSample, RegexCategory};
  use serde_json::json;

  fn sample_level() -> LevelDefinition {
    LevelDefinition {
      id: "custom-42".into(),
      order: 33,
      tier: 2,
      title: "Shared Puzzle".into(),
      objective: "Match shared things.".into(),
      hint: "Think simple.".into(),
      category: RegexCategory::Quantifier,
      starter_pattern: Some("a+".into()),
      starter_flags: None,
      samples: vec![
        LevelSample { text: "aaa".into(), should_match: true, note: None },
        LevelSample { text: "bbb".into(), should_match: false, note: Some("decoy".into()) },
      ],
      tags: vec!["shared".into()],
    }
  }

  fn encode_value(value: &serde_json::Value) -> String {
    format!("custom={}", URL_SAFE_NO_PAD.encode(value.to_string()))
  }

  #[test]
  fn levels_round_trip_through_the_fragment() {
    let level = sample_level();
    let fragment = encode_level(&level);
    let decoded = decode_level(&fragment).unwrap();
    assert_eq!(decoded, level);
  }

  #[test]
  fn leading_hash_and_extra_params_are_tolerated() {
    let fragment = encode_level(&sample_level());
    assert!(decode_level(&format!("#{}", fragment)).is_some());
    assert!(decode_level(&format!("utm=1&{}&x=2", fragment)).is_some());
  }

  #[test]
  fn missing_samples_reject_the_payload() {
    let value = json!({
      "id": "custom-1", "order": 33, "tier": 1,
      "title": "t", "objective": "o", "hint": "h",
      "category": "literal", "tags": []
    });
    assert!(decode_level(&encode_value(&value)).is_none());
  }

  #[test]
  fn unknown_category_normalizes_to_literal() {
    let value = json!({
      "id": "custom-1", "order": 33, "tier": 1,
      "title": "t", "objective": "o", "hint": "h",
      "category": "witchcraft",
      "samples": [{"text": "a", "shouldMatch": true}],
      "tags": []
    });
    let decoded = decode_level(&encode_value(&value)).unwrap();
    assert_eq!(decoded.category, RegexCategory::Literal);
  }

  #[test]
  fn garbage_fragments_decode_to_none() {
    assert!(decode_level("").is_none());
    assert!(decode_level("#other=thing").is_none());
    assert!(decode_level("custom=%%%not-base64%%%").is_none());

    let not_json = format!("custom={}", URL_SAFE_NO_PAD.encode("not json"));
    assert!(decode_level(&not_json).is_none());
  }

  #[test]
  fn padded_base64_still_decodes() {
    let mut fragment = encode_level(&sample_level());
    fragment.push_str("==");
    assert!(decode_level(&fragment).is_some());
  }
}
