//! Pattern tokenizer for the token-flow diagram.
//!
//! Greedy fixed-rule lexing, not a parse: ambiguous or malformed input
//! degrades to literal tokens and never fails. Each token carries the matched
//! substring as its display label plus a type tag from a closed set.

use serde::Serialize;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
  Anchor,
  Class,
  Group,
  Lookaround,
  Quantifier,
  Literal,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagramToken {
  pub label: String,
  pub token_type: TokenType,
}

fn token(label: impl Into<String>, token_type: TokenType) -> DiagramToken {
  DiagramToken { label: label.into(), token_type }
}

/// Decompose a pattern source into a flat left-to-right token sequence.
pub fn tokenize_pattern(source: &str) -> Vec<DiagramToken> {
  let chars: Vec<char> = source.chars().collect();
  let mut tokens = Vec::new();
  let mut i = 0usize;

  let label_of = |from: usize, to: usize| -> String { chars[from..to].iter().collect() };
  let starts_with = |at: usize, prefix: &str| -> bool {
    prefix.chars().enumerate().all(|(k, p)| chars.get(at + k) == Some(&p))
  };

  while i < chars.len() {
    let ch = chars[i];

    // Escape sequence: `\` plus the next character is one class token.
    if ch == '\\' && i + 1 < chars.len() {
      tokens.push(token(label_of(i, i + 2), TokenType::Class));
      i += 2;
      continue;
    }

    // Bracket expression, honoring `\` escapes, up to the first unescaped `]`
    // (or the end of the pattern when unterminated).
    if ch == '[' {
      let mut end = i + 1;
      let mut escaped = false;
      while end < chars.len() {
        let current = chars[end];
        if escaped {
          escaped = false;
        } else if current == '\\' {
          escaped = true;
        } else if current == ']' {
          break;
        }
        end += 1;
      }
      let label_end = (end + 1).min(chars.len());
      tokens.push(token(label_of(i, label_end), TokenType::Class));
      i = label_end;
      continue;
    }

    // Brace quantifier; an unclosed `{` falls through to a literal.
    if ch == '{' {
      if let Some(close) = chars[i + 1..].iter().position(|c| *c == '}') {
        let end = i + 1 + close;
        tokens.push(token(label_of(i, end + 1), TokenType::Quantifier));
        i = end + 1;
        continue;
      }
    }

    if matches!(ch, '*' | '+' | '?') {
      tokens.push(token(ch.to_string(), TokenType::Quantifier));
      i += 1;
      continue;
    }

    if matches!(ch, '^' | '$') {
      tokens.push(token(ch.to_string(), TokenType::Anchor));
      i += 1;
      continue;
    }

    // Group openers classified by prefix. Lookbehind before the named-group
    // opener, which shares the `(?<` prefix.
    if ch == '(' {
      let (label, token_type) = if starts_with(i, "(?<=") || starts_with(i, "(?<!") {
        (label_of(i, i + 4), TokenType::Lookaround)
      } else if starts_with(i, "(?=") || starts_with(i, "(?!") {
        (label_of(i, i + 3), TokenType::Lookaround)
      } else if starts_with(i, "(?:") || starts_with(i, "(?<") {
        (label_of(i, i + 3), TokenType::Group)
      } else {
        ("(".to_string(), TokenType::Group)
      };
      i += label.chars().count();
      tokens.push(token(label, token_type));
      continue;
    }

    if ch == ')' {
      tokens.push(token(")", TokenType::Group));
      i += 1;
      continue;
    }

    tokens.push(token(ch.to_string(), TokenType::Literal));
    i += 1;
  }

  tokens
}
