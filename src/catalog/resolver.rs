// Fuzzy name → cosmetic id resolution

use super::CatalogEntry;
use log::debug;

pub const DEFAULT_MIN_SIMILARITY: f64 = 0.30;

#[derive(Debug, Clone, PartialEq)]
pub struct SkinMatch {
  pub id: u32,
  pub name: String,
  pub score: f64,
}

/// Case-folded, quote-fixed, whitespace-collapsed form used for scoring.
pub fn normalize_name(raw: &str) -> String {
  raw
    .chars()
    .map(|c| match c {
      '\u{2019}' | '\u{2018}' | '`' | '\u{00B4}' => '\'',
      other => other,
    })
    .collect::<String>()
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

/// `1 - edit_distance / max_len` over normalized names, in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
  let a = normalize_name(a);
  let b = normalize_name(b);
  let max_len = a.chars().count().max(b.chars().count());
  if max_len == 0 {
    return 0.0;
  }
  1.0 - levenshtein::levenshtein(&a, &b) as f64 / max_len as f64
}

#[derive(Debug, Clone, Copy)]
pub struct Resolver {
  min_similarity: f64,
}

impl Default for Resolver {
  fn default() -> Self {
    Self::new(DEFAULT_MIN_SIMILARITY)
  }
}

impl Resolver {
  pub fn new(min_similarity: f64) -> Self {
    Self { min_similarity }
  }

  pub fn min_similarity(&self) -> f64 {
    self.min_similarity
  }

  /// Best-scoring entry at or above the threshold. Equal scores keep the
  /// entry seen first.
  pub fn resolve(&self, detected: &str, entries: &[CatalogEntry]) -> Option<SkinMatch> {
    if detected.trim().is_empty() {
      return None;
    }

    let mut best: Option<(&CatalogEntry, f64)> = None;
    for entry in entries {
      let score = similarity(detected, &entry.name);
      if best.map_or(true, |(_, s)| score > s) {
        best = Some((entry, score));
      }
    }

    match best {
      Some((entry, score)) if score >= self.min_similarity => Some(SkinMatch {
        id: entry.id,
        name: entry.name.clone(),
        score,
      }),
      Some((entry, score)) => {
        debug!(
          "[Resolver] No match for '{}' (best '{}' at {:.2} < {:.2})",
          detected, entry.name, score, self.min_similarity
        );
        None
      }
      None => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn catalog() -> Vec<CatalogEntry> {
    vec![
      CatalogEntry::new(157000, "Yasuo"),
      CatalogEntry::new(157001, "High Noon Yasuo"),
      CatalogEntry::new(157002, "Dragon Fist"),
      CatalogEntry::new(157009, "Nightbringer Yasuo"),
    ]
  }

  #[test]
  fn normalization_fixes_quotes_and_spacing() {
    assert_eq!(normalize_name("  Kai\u{2019}Sa \n  Prestige "), "kai'sa prestige");
    assert_eq!(normalize_name("K`Sante"), "k'sante");
  }

  #[test]
  fn exact_name_scores_one() {
    assert!((similarity("Dragon Fist", "dragon  fist") - 1.0).abs() < f64::EPSILON);
  }

  #[test]
  fn noisy_text_resolves_to_best_candidate() {
    let m = Resolver::default().resolve("Dragn Fst", &catalog()).unwrap();
    assert_eq!(m.id, 157002);
    assert!(m.score >= DEFAULT_MIN_SIMILARITY);
  }

  #[test]
  fn below_threshold_is_rejected() {
    assert!(Resolver::new(0.9).resolve("Dragn Fst", &catalog()).is_none());
    assert!(Resolver::default().resolve("zzzzzzzzzzzzzzzzzzzz", &catalog()).is_none());
    assert!(Resolver::default().resolve("   ", &catalog()).is_none());
  }

  #[test]
  fn ties_keep_first_seen_entry() {
    let entries = vec![CatalogEntry::new(1001, "Abc"), CatalogEntry::new(1002, "Abd")];
    let m = Resolver::default().resolve("Abx", &entries).unwrap();
    assert_eq!(m.id, 1001);
  }

  #[test]
  fn returned_match_is_max_scoring_and_above_threshold() {
    let resolver = Resolver::default();
    let entries = catalog();
    for detected in ["yasuo", "high noon", "nightbringr yasou", "dragon", "fist", "qwerty"] {
      if let Some(m) = resolver.resolve(detected, &entries) {
        assert!(m.score >= resolver.min_similarity());
        let best = entries
          .iter()
          .map(|e| similarity(detected, &e.name))
          .fold(f64::MIN, f64::max);
        assert!((m.score - best).abs() < 1e-9, "{} picked {}", detected, m.name);
      }
    }
  }
}
