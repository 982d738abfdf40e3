//! Cosmetic id arithmetic.
//!
//! Ids are grouped per champion (`champion_id * 1000 + n`). A variant
//! ("chroma") sits within `+1..=+99` of the cosmetic it recolors. A few
//! legacy items break that numbering and are listed in [`BASE_OVERRIDES`],
//! which is always consulted before the arithmetic rule.

pub const CHAMPION_STRIDE: u32 = 1000;
pub const VARIANT_WINDOW: u32 = 99;

/// Inclusive id range whose base is fixed regardless of arithmetic.
#[derive(Debug, Clone, Copy)]
pub struct BaseOverride {
  pub first: u32,
  pub last: u32,
  pub base: u32,
}

pub const BASE_OVERRIDES: &[BaseOverride] = &[
  // Elementalist Lux forms
  BaseOverride { first: 99007, last: 99007, base: 99007 },
  BaseOverride { first: 99991, last: 99999, base: 99007 },
  // Risen Legend Ahri
  BaseOverride { first: 145070, last: 145071, base: 145070 },
  // Sahn-Uzal Mordekaiser
  BaseOverride { first: 103085, last: 103086, base: 103085 },
];

pub fn override_base(id: u32) -> Option<u32> {
  BASE_OVERRIDES
    .iter()
    .find(|o| (o.first..=o.last).contains(&id))
    .map(|o| o.base)
}

pub fn champion_of(id: u32) -> u32 {
  id / CHAMPION_STRIDE
}

/// The champion's default look (`n == 0`).
pub fn is_default_cosmetic(id: u32) -> bool {
  id % CHAMPION_STRIDE == 0
}

/// Base cosmetic for `id`: the override table first, then the id itself.
pub fn base_of(id: u32) -> u32 {
  override_base(id).unwrap_or(id)
}

/// Whether moving the hover from `prev` to `next` stays among the variants
/// of `prev`. The window is anchored at the base of `prev` and never
/// crosses into another champion's range.
pub fn stays_within_variants(prev: u32, next: u32) -> bool {
  let anchor = base_of(prev);
  if let Some(base) = override_base(next) {
    return base == anchor;
  }
  next > anchor && next - anchor <= VARIANT_WINDOW && champion_of(next) == champion_of(anchor)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn overrides_win_over_arithmetic() {
    assert_eq!(base_of(99995), 99007);
    assert_eq!(base_of(145071), 145070);
    assert_eq!(base_of(103086), 103085);
    assert_eq!(base_of(157003), 157003);
    assert_eq!(override_base(99007), Some(99007));
    assert_eq!(override_base(157003), None);
  }

  #[test]
  fn window_covers_offsets_one_through_ninety_nine() {
    let a = 157002;
    for b in (a + 1)..=(a + VARIANT_WINDOW) {
      assert!(stays_within_variants(a, b), "{} -> {}", a, b);
    }
    assert!(!stays_within_variants(a, a + VARIANT_WINDOW + 1));
    assert!(!stays_within_variants(a, 157000));
    assert!(!stays_within_variants(a, 64002));
  }

  #[test]
  fn window_does_not_cross_champion_boundary() {
    assert!(!stays_within_variants(157950, 158001));
  }

  #[test]
  fn legacy_variants_stay_with_their_base() {
    assert!(stays_within_variants(99007, 99993));
    assert!(stays_within_variants(99993, 99997));
    assert!(stays_within_variants(145070, 145071));
    assert!(!stays_within_variants(99007, 145071));
  }

  #[test]
  fn default_cosmetic_detection() {
    assert!(is_default_cosmetic(157000));
    assert!(!is_default_cosmetic(157002));
    assert_eq!(champion_of(157002), 157);
  }
}
