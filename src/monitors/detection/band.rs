// Locating and cleaning up the name band of a champ-select screenshot
// before OCR.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::{edges, filter, morphology};
use serde::{Deserialize, Serialize};

const FALLBACK_BAND: (f32, f32) = (0.58, 0.66);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
  /// Vertical range (percent of height) searched for the band center.
  pub span_pct: (f32, f32),
  pub height_pct: f32,
  pub steps: u32,
  pub min_height_px: u32,
  pub left_pct: f32,
  pub right_pct: f32,
  /// HSV bounds for white text, hue 0..180, saturation and value 0..255.
  pub white_lower: [u8; 3],
  pub white_upper: [u8; 3],
  pub canny_low: f32,
  pub canny_high: f32,
  pub weight_mask: f32,
  pub weight_edges: f32,
  pub upscale_below_px: u32,
}

impl Default for BandConfig {
  fn default() -> Self {
    Self {
      span_pct: (50.0, 75.0),
      height_pct: 7.0,
      steps: 8,
      min_height_px: 16,
      left_pct: 20.0,
      right_pct: 80.0,
      white_lower: [0, 0, 200],
      white_upper: [180, 40, 255],
      canny_low: 50.0,
      canny_high: 150.0,
      weight_mask: 0.6,
      weight_edges: 0.4,
      upscale_below_px: 120,
    }
  }
}

/// A horizontal strip of the screenshot, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

impl BandConfig {
  fn clamped_height_pct(&self) -> f32 {
    self.height_pct.clamp(4.0, 12.0)
  }

  fn horizontal(&self, width: u32) -> (u32, u32) {
    let left = (width as f32 * self.left_pct / 100.0).round() as u32;
    let right = (width as f32 * self.right_pct / 100.0).round() as u32;
    let right = right.clamp(left.saturating_add(1).min(width), width);
    (left.min(width.saturating_sub(1)), right)
  }

  /// Candidate bands evenly spaced through the search span.
  pub fn band_candidates(&self, width: u32, height: u32) -> Vec<Band> {
    if width == 0 || height == 0 {
      return Vec::new();
    }
    let band_h = ((height as f32 * self.clamped_height_pct() / 100.0).round() as u32)
      .max(self.min_height_px)
      .min(height);
    let (left, right) = self.horizontal(width);
    let steps = self.steps.max(1);
    let (from, to) = self.span_pct;

    let mut bands = Vec::with_capacity(steps as usize);
    for i in 0..steps {
      let t = if steps == 1 { 0.5 } else { i as f32 / (steps - 1) as f32 };
      let center = height as f32 * (from + (to - from) * t) / 100.0;
      let top = (center - band_h as f32 / 2.0).round().max(0.0) as u32;
      let top = top.min(height - band_h);
      let band = Band {
        x: left,
        y: top,
        width: right - left,
        height: band_h,
      };
      if bands.last() != Some(&band) {
        bands.push(band);
      }
    }
    bands
  }

  pub fn fallback_band(&self, width: u32, height: u32) -> Band {
    let (left, right) = self.horizontal(width);
    let top = (height as f32 * FALLBACK_BAND.0).round() as u32;
    let bottom = ((height as f32 * FALLBACK_BAND.1).round() as u32).max(top + 1).min(height);
    Band {
      x: left,
      y: top.min(height.saturating_sub(1)),
      width: right - left,
      height: bottom.saturating_sub(top).max(1),
    }
  }

  pub fn white_mask(&self, image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
      let [r, g, b] = image.get_pixel(x, y).0;
      let hsv = rgb_to_hsv(r, g, b);
      let inside = (0..3).all(|i| hsv[i] >= self.white_lower[i] && hsv[i] <= self.white_upper[i]);
      Luma([if inside { 255 } else { 0 }])
    })
  }

  /// Weighted share of white-text pixels and edge pixels in `band`.
  pub fn score_white_text(&self, image: &RgbImage, band: Band) -> f32 {
    let crop = imageops::crop_imm(image, band.x, band.y, band.width, band.height).to_image();
    let total = (crop.width() * crop.height()) as f32;
    if total == 0.0 {
      return 0.0;
    }
    let mask = self.white_mask(&crop);
    let edges = edges::canny(&imageops::grayscale(&crop), self.canny_low, self.canny_high);
    let on = |img: &GrayImage| img.pixels().filter(|p| p.0[0] > 0).count() as f32 / total;
    self.weight_mask * on(&mask) + self.weight_edges * on(&edges)
  }

  /// Best scoring candidate; the fixed fallback band when nothing scores.
  pub fn choose_band(&self, image: &RgbImage) -> Band {
    let mut best: Option<(Band, f32)> = None;
    for band in self.band_candidates(image.width(), image.height()) {
      let score = self.score_white_text(image, band);
      if score > 0.0 && best.map_or(true, |(_, s)| score > s) {
        best = Some((band, score));
      }
    }
    best
      .map(|(band, _)| band)
      .unwrap_or_else(|| self.fallback_band(image.width(), image.height()))
  }

  /// Dark text on white for the OCR engine: white mask, close, dilate,
  /// invert, median, with a 2x upscale for short bands.
  pub fn preprocess(&self, image: &RgbImage, band: Band) -> GrayImage {
    let mut crop = imageops::crop_imm(image, band.x, band.y, band.width, band.height).to_image();
    if crop.height() < self.upscale_below_px {
      crop = imageops::resize(&crop, crop.width() * 2, crop.height() * 2, FilterType::CatmullRom);
    }
    let mask = self.white_mask(&crop);
    let closed = morphology::close(&mask, Norm::LInf, 1);
    let mut dilated = morphology::dilate(&closed, Norm::LInf, 1);
    imageops::invert(&mut dilated);
    filter::median_filter(&dilated, 1, 1)
  }
}

/// RGB to HSV with hue in 0..180 and saturation/value in 0..255.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
  let (rf, gf, bf) = (r as f32, g as f32, b as f32);
  let max = rf.max(gf).max(bf);
  let min = rf.min(gf).min(bf);
  let delta = max - min;
  let s = if max == 0.0 { 0.0 } else { delta / max * 255.0 };
  let h = if delta == 0.0 {
    0.0
  } else if max == rf {
    60.0 * ((gf - bf) / delta)
  } else if max == gf {
    60.0 * ((bf - rf) / delta) + 120.0
  } else {
    60.0 * ((rf - gf) / delta) + 240.0
  };
  let h = if h < 0.0 { h + 360.0 } else { h };
  [(h / 2.0).round().min(180.0) as u8, s.round() as u8, max as u8]
}

/// Clean up raw OCR output before resolution.
pub fn normalize_ocr_text(raw: &str) -> String {
  let replaced: String = raw
    .chars()
    .map(|c| match c {
      '\u{2019}' | '\u{2018}' | '`' => '\'',
      '\n' | '\r' => ' ',
      other => other,
    })
    .collect();
  replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}
