//! Noise filtering for raw OCR output before it is merged.
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Characters OCR typically produces from table borders and decorations.
pub const DEFAULT_NOISE_SYMBOLS: &str = "|-+=()@#";

/// Footer line printed under every ChatGPT answer.
pub const DEFAULT_DISCLAIMER: &str = "ChatGPT can make mistakes";

static DEFAULT_CLEANER: OnceLock<LineCleaner> = OnceLock::new();

/// Which lines of recognised text are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningPolicy {
  /// Lines shorter than this after trimming are dropped.
  pub min_line_chars: usize,
  /// Lines made only of these characters (plus whitespace) are dropped.
  pub noise_symbols: String,
  /// Lines containing any of these substrings are dropped.
  pub disclaimers: Vec<String>,
}

impl Default for CleaningPolicy {
  fn default() -> Self {
    Self {
      min_line_chars: 3,
      noise_symbols: DEFAULT_NOISE_SYMBOLS.to_string(),
      disclaimers: vec![DEFAULT_DISCLAIMER.to_string()],
    }
  }
}

/// A [`CleaningPolicy`] with its noise pattern compiled once.
#[derive(Debug, Clone)]
pub struct LineCleaner {
  policy: CleaningPolicy,
  noise: Option<Regex>,
}

impl LineCleaner {
  pub fn new(policy: CleaningPolicy) -> Self {
    let noise = noise_pattern(&policy.noise_symbols);
    Self { policy, noise }
  }

  pub fn policy(&self) -> &CleaningPolicy {
    &self.policy
  }

  /// Returns whether a trimmed line survives the policy.
  pub fn keeps(&self, line: &str) -> bool {
    if line.is_empty() || line.chars().count() < self.policy.min_line_chars {
      return false;
    }
    if self.noise.as_ref().is_some_and(|re| re.is_match(line)) {
      return false;
    }
    !self
      .policy
      .disclaimers
      .iter()
      .any(|d| !d.is_empty() && line.contains(d.as_str()))
  }

  /// Drops noise lines and joins the survivors with single spaces.
  pub fn clean(&self, raw: &str) -> String {
    raw
      .lines()
      .map(str::trim)
      .filter(|line| self.keeps(line))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

impl Default for LineCleaner {
  fn default() -> Self {
    Self::new(CleaningPolicy::default())
  }
}

fn noise_pattern(symbols: &str) -> Option<Regex> {
  if symbols.is_empty() {
    return None;
  }
  let class: String = symbols
    .chars()
    .map(|c| format!("\\x{{{:X}}}", c as u32))
    .collect();
  RegexBuilder::new(&format!(r"^[{class}\s]+$"))
    .unicode(true)
    .build()
    .ok()
}

/// Cleans raw OCR text with `policy`.
pub fn clean_ocr_text(raw: &str, policy: &CleaningPolicy) -> String {
  if *policy == CleaningPolicy::default() {
    return clean_with_defaults(raw);
  }
  LineCleaner::new(policy.clone()).clean(raw)
}

/// Cleans raw OCR text with the default policy.
pub fn clean_with_defaults(raw: &str) -> String {
  DEFAULT_CLEANER.get_or_init(LineCleaner::default).clean(raw)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_reference_example() {
    let raw = "ab\n----\n@#@\nHello world\nChatGPT can make mistakes\nOK go";
    assert_eq!(clean_with_defaults(raw), "Hello world OK go");
  }

  #[test]
  fn test_short_lines_counted_in_chars() {
    // Two multi-byte characters are still only two characters.
    assert_eq!(clean_with_defaults("日本\n日本語\n  x  "), "日本語");
  }

  #[test]
  fn test_symbol_lines_with_inner_spaces_dropped() {
    assert_eq!(clean_with_defaults("| -- | -- |\n(=) + (=)\nrow one"), "row one");
  }

  #[test]
  fn test_symbols_mixed_with_text_survive() {
    assert_eq!(clean_with_defaults("#1 priority\n(a) b"), "#1 priority (a) b");
  }

  #[test]
  fn test_disclaimer_matches_substring() {
    let raw = "answer text\nChatGPT can make mistakes. Check important info.";
    assert_eq!(clean_with_defaults(raw), "answer text");
  }

  #[test]
  fn test_custom_policy() {
    let policy = CleaningPolicy {
      min_line_chars: 1,
      noise_symbols: "*".to_string(),
      disclaimers: vec!["Sponsored".to_string()],
    };
    let raw = "a\n***\n----\nSponsored post\nok";
    assert_eq!(clean_ocr_text(raw, &policy), "a ---- ok");
  }

  #[test]
  fn test_empty_noise_set_keeps_symbol_lines() {
    let policy = CleaningPolicy {
      noise_symbols: String::new(),
      ..CleaningPolicy::default()
    };
    assert_eq!(clean_ocr_text("----\nabc", &policy), "---- abc");
  }

  #[test]
  fn test_empty_input_cleans_to_empty() {
    assert_eq!(clean_with_defaults(""), "");
    assert_eq!(clean_with_defaults("\n\n  \n"), "");
  }

  #[test]
  fn test_policy_deserializes_with_defaults() {
    let policy: CleaningPolicy = serde_json::from_str(r#"{"min_line_chars": 5}"#).unwrap();
    assert_eq!(policy.min_line_chars, 5);
    assert_eq!(policy.noise_symbols, DEFAULT_NOISE_SYMBOLS);
    assert_eq!(policy.disclaimers, vec![DEFAULT_DISCLAIMER.to_string()]);
  }
}
