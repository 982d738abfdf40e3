// UI-tree scraping detector. The automation backend is a platform
// collaborator behind `UiAutomation`; this side owns the structural path,
// handle caching and the discovery retry policy.

use super::{DetectError, TextDetector};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const BACKOFF_AFTER_ATTEMPTS: u32 = 10;
const GIVE_UP_AFTER_ATTEMPTS: u32 = 50;
const DISCOVERY_BACKOFF: Duration = Duration::from_millis(500);

/// One level of the path from the client window to the name labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiPathStep {
  pub control_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub class_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub automation_id: Option<String>,
}

impl UiPathStep {
  pub fn control(control_type: &str) -> Self {
    Self {
      control_type: control_type.to_string(),
      class_name: None,
      automation_id: None,
    }
  }

  pub fn with_class(mut self, class_name: &str) -> Self {
    self.class_name = Some(class_name.to_string());
    self
  }
}

pub fn default_ui_path() -> Vec<UiPathStep> {
  vec![
    UiPathStep::control("Window").with_class("RCLIENT"),
    UiPathStep::control("Pane").with_class("CefBrowserWindow"),
    UiPathStep::control("Document"),
    UiPathStep::control("Text"),
  ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UiHandle(pub u64);

#[derive(Debug, Clone)]
pub struct UiTextElement {
  pub text: String,
  pub handle: UiHandle,
}

pub trait UiAutomation: Send + 'static {
  /// Walk `path` and return the text elements found at its end.
  fn find_text_elements(&mut self, path: &[UiPathStep]) -> Result<Vec<UiTextElement>, DetectError>;
  /// Current text of a previously found element. `StaleHandle` once the
  /// element is gone.
  fn read_text(&mut self, handle: UiHandle) -> Result<String, DetectError>;
}

pub struct UiScrapeDetector<A: UiAutomation> {
  backend: A,
  path: Vec<UiPathStep>,
  handles: Vec<UiHandle>,
  attempts: u32,
  next_attempt_at: Option<Instant>,
  gave_up: bool,
}

impl<A: UiAutomation> UiScrapeDetector<A> {
  pub fn new(backend: A, path: Vec<UiPathStep>) -> Self {
    Self {
      backend,
      path,
      handles: Vec::new(),
      attempts: 0,
      next_attempt_at: None,
      gave_up: false,
    }
  }

  pub fn attempts(&self) -> u32 {
    self.attempts
  }

  pub fn gave_up(&self) -> bool {
    self.gave_up
  }

  fn discover(&mut self) {
    if self.gave_up {
      return;
    }
    if let Some(at) = self.next_attempt_at {
      if Instant::now() < at {
        return;
      }
    }

    match self.backend.find_text_elements(&self.path) {
      Ok(elements) if !elements.is_empty() => {
        debug!("[Detection][UI] Found {} text elements", elements.len());
        self.handles = elements.into_iter().map(|e| e.handle).collect();
        self.attempts = 0;
        self.next_attempt_at = None;
        return;
      }
      Ok(_) => {}
      Err(e) => debug!("[Detection][UI] Discovery failed: {}", e),
    }

    self.attempts += 1;
    if self.attempts >= GIVE_UP_AFTER_ATTEMPTS {
      warn!("[Detection][UI] Name labels not found after {} attempts; giving up until reset", self.attempts);
      self.gave_up = true;
    } else if self.attempts >= BACKOFF_AFTER_ATTEMPTS {
      self.next_attempt_at = Some(Instant::now() + DISCOVERY_BACKOFF);
    }
  }
}

impl<A: UiAutomation> TextDetector for UiScrapeDetector<A> {
  fn name(&self) -> &'static str {
    "UI"
  }

  fn poll(&mut self) -> Result<Option<String>, DetectError> {
    if self.handles.is_empty() {
      self.discover();
    }
    for handle in self.handles.clone() {
      match self.backend.read_text(handle) {
        Ok(text) if !text.trim().is_empty() => return Ok(Some(text.trim().to_string())),
        Ok(_) => {}
        Err(e) => {
          self.handles.clear();
          return Err(e);
        }
      }
    }
    Ok(None)
  }

  fn reset(&mut self) {
    self.handles.clear();
    self.attempts = 0;
    self.next_attempt_at = None;
    self.gave_up = false;
  }
}
