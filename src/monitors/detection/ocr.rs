// Screen OCR detector: capture, pick the name band, clean it up, recognize.

use super::band::{normalize_ocr_text, BandConfig};
use super::{DetectError, TextDetector};
use image::{GrayImage, RgbImage};
use log::debug;
use std::path::{Path, PathBuf};

/// Source of screenshots of the client window.
pub trait ScreenSource: Send + 'static {
  /// `Ok(None)` when the window is not on screen.
  fn capture(&mut self) -> Result<Option<RgbImage>, DetectError>;
}

/// Text recognition over a preprocessed band.
pub trait OcrBackend: Send + 'static {
  fn recognize(&mut self, image: &GrayImage) -> Result<String, DetectError>;
}

pub struct OcrDetector<S: ScreenSource, B: OcrBackend> {
  screen: S,
  backend: B,
  band: BandConfig,
}

impl<S: ScreenSource, B: OcrBackend> OcrDetector<S, B> {
  pub fn new(screen: S, backend: B, band: BandConfig) -> Self {
    Self { screen, backend, band }
  }
}

impl<S: ScreenSource, B: OcrBackend> TextDetector for OcrDetector<S, B> {
  fn name(&self) -> &'static str {
    "OCR"
  }

  fn poll(&mut self) -> Result<Option<String>, DetectError> {
    let Some(frame) = self.screen.capture()? else {
      return Ok(None);
    };
    let band = self.band.choose_band(&frame);
    let cleaned = self.band.preprocess(&frame, band);
    let text = normalize_ocr_text(&self.backend.recognize(&cleaned)?);
    if text.is_empty() {
      return Ok(None);
    }
    debug!("[Detection][OCR] Read '{}' from band y={} h={}", text, band.y, band.height);
    Ok(Some(text))
  }

  fn reset(&mut self) {}
}

/// Model files expected in the OCR model directory.
#[derive(Debug, Clone)]
pub struct OcrModelPaths {
  pub detection: PathBuf,
  pub recognition: PathBuf,
  pub charset: PathBuf,
}

impl OcrModelPaths {
  pub fn in_dir(dir: &Path) -> Self {
    Self {
      detection: dir.join("det.mnn"),
      recognition: dir.join("rec.mnn"),
      charset: dir.join("keys.txt"),
    }
  }

  pub fn missing(&self) -> Vec<&Path> {
    [&self.detection, &self.recognition, &self.charset]
      .into_iter()
      .filter(|p| !p.exists())
      .map(|p| p.as_path())
      .collect()
  }
}

#[cfg(feature = "ocr")]
pub use native::{PaddleOcr, WindowCapture};

#[cfg(feature = "ocr")]
mod native {
  use super::{OcrBackend, OcrModelPaths, ScreenSource};
  use crate::monitors::detection::DetectError;
  use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

  /// Captures the first window whose title or app name matches.
  pub struct WindowCapture {
    window_name: String,
  }

  impl WindowCapture {
    pub fn new(window_name: &str) -> Self {
      Self {
        window_name: window_name.to_string(),
      }
    }

    fn find(&self) -> Option<xcap::Window> {
      xcap::Window::all().ok()?.into_iter().find(|w| {
        w.title().ok().as_deref() == Some(self.window_name.as_str())
          || w.app_name().ok().as_deref() == Some(self.window_name.as_str())
      })
    }
  }

  impl ScreenSource for WindowCapture {
    fn capture(&mut self) -> Result<Option<RgbImage>, DetectError> {
      let Some(window) = self.find() else {
        return Ok(None);
      };
      if window.is_minimized().unwrap_or(false) {
        return Ok(None);
      }
      let shot = window
        .capture_image()
        .map_err(|e| DetectError::Capture(e.to_string()))?;
      let (width, height) = (shot.width(), shot.height());
      let rgba = RgbaImage::from_raw(width, height, shot.into_raw())
        .ok_or_else(|| DetectError::Capture("unexpected frame layout".into()))?;
      Ok(Some(DynamicImage::ImageRgba8(rgba).to_rgb8()))
    }
  }

  pub struct PaddleOcr {
    engine: ocr_rs::OcrEngine,
  }

  impl PaddleOcr {
    pub fn new(models: &OcrModelPaths) -> Result<Self, DetectError> {
      let thread_count = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
      let engine = ocr_rs::OcrEngine::new(
        &models.detection,
        &models.recognition,
        &models.charset,
        Some(ocr_rs::OcrEngineConfig {
          backend: ocr_rs::Backend::CPU,
          thread_count,
          precision_mode: ocr_rs::PrecisionMode::High,
          enable_parallel: thread_count > 1,
          min_result_confidence: 0.5,
          ..Default::default()
        }),
      )
      .map_err(|e| DetectError::Unavailable(e.to_string()))?;
      Ok(Self { engine })
    }
  }

  impl OcrBackend for PaddleOcr {
    fn recognize(&mut self, image: &GrayImage) -> Result<String, DetectError> {
      let rgb = DynamicImage::ImageLuma8(image.clone()).to_rgb8();
      let input = ocr_rs::preprocess::rgb_to_image(rgb.as_raw(), rgb.width(), rgb.height());
      let results = self
        .engine
        .recognize(&input)
        .map_err(|e| DetectError::Backend(e.to_string()))?;
      Ok(results.into_iter().map(|r| r.text).collect::<Vec<_>>().join(" "))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  struct StillFrame(Option<RgbImage>);

  impl ScreenSource for StillFrame {
    fn capture(&mut self) -> Result<Option<RgbImage>, DetectError> {
      Ok(self.0.clone())
    }
  }

  struct Canned(&'static str);

  impl OcrBackend for Canned {
    fn recognize(&mut self, image: &GrayImage) -> Result<String, DetectError> {
      assert!(image.width() > 0 && image.height() > 0);
      Ok(self.0.to_string())
    }
  }

  #[test]
  fn recognized_text_is_normalized() {
    let frame = RgbImage::from_pixel(320, 180, Rgb([10, 10, 10]));
    let mut detector = OcrDetector::new(StillFrame(Some(frame)), Canned(" Dragn\nFst  Lee Sin "), BandConfig::default());
    assert_eq!(detector.poll().unwrap().as_deref(), Some("Dragn Fst Lee Sin"));
  }

  #[test]
  fn no_window_or_blank_text_yields_nothing() {
    let mut hidden = OcrDetector::new(StillFrame(None), Canned("x"), BandConfig::default());
    assert!(hidden.poll().unwrap().is_none());

    let frame = RgbImage::from_pixel(320, 180, Rgb([10, 10, 10]));
    let mut blank = OcrDetector::new(StillFrame(Some(frame)), Canned("  \n "), BandConfig::default());
    assert!(blank.poll().unwrap().is_none());
  }

  #[test]
  fn model_paths_report_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let paths = OcrModelPaths::in_dir(dir.path());
    assert_eq!(paths.missing().len(), 3);
    std::fs::write(&paths.charset, "abc").unwrap();
    assert_eq!(paths.missing().len(), 2);
  }
}
