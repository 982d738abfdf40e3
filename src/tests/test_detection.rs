// Tests for the detection monitor: gating, dedup, resolution and re-arming

use super::test_helpers::*;

#[cfg(test)]
mod detection_tests {
    use super::*;
    use crate::catalog::{Resolver, SkinCatalog};
    use crate::monitors::detection::Gating;
    use crate::monitors::{DetectionMonitor, Monitor};
    use crate::state::{Phase, SharedState};
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixture {
        client: Arc<MockClient>,
        state: Arc<SharedState>,
        screen: Screen,
        catalog: Arc<SkinCatalog>,
        monitor: DetectionMonitor<ScriptedDetector>,
    }

    fn fixture(grace: Duration) -> Fixture {
        let client = MockClient::new();
        client.set_catalog(LEE_SIN, lee_sin_catalog());
        let state = Arc::new(SharedState::new());
        let catalog = Arc::new(SkinCatalog::new(client.clone()));
        let screen = Screen::default();
        let monitor = DetectionMonitor::new(
            screen.detector(),
            state.clone(),
            catalog.clone(),
            Resolver::new(0.30),
            Gating {
                grace,
                injection_threshold_ms: 300,
            },
            Duration::from_millis(10),
        );
        Fixture {
            client,
            state,
            screen,
            catalog,
            monitor,
        }
    }

    fn lock(f: &Fixture) {
        f.state.set_phase(Phase::ChampSelect);
        f.state.record_lock(LEE_SIN, HashSet::new());
    }

    /// Test: No polling before a lock settles
    ///
    /// Scenario: In champ select with a lock younger than the grace period.
    /// Expected: The detector is never polled.
    #[test]
    fn test_no_detection_within_grace() {
        let mut f = fixture(Duration::from_secs(10));
        f.screen.show("Dragon Fist Lee Sin");
        f.monitor.tick();
        lock(&f);
        f.monitor.tick();

        assert_eq!(f.screen.polls(), 0);
        assert!(!f.monitor.is_active());
    }

    /// Test: Detected name resolves to the hovered cosmetic
    ///
    /// Scenario: Lock settled, the UI shows "Dragon Fist Lee Sin".
    /// Expected: Selection recorded with id 64003 and its catalog name.
    #[test]
    fn test_detected_name_is_recorded() {
        let mut f = fixture(Duration::ZERO);
        lock(&f);
        f.screen.show("Dragon Fist Lee Sin");
        f.monitor.tick();

        let snap = f.state.snapshot();
        assert_eq!(snap.last_hovered_cosmetic_id, Some(64003));
        assert_eq!(snap.last_hovered_cosmetic_name.as_deref(), Some("Dragon Fist Lee Sin"));
        assert_eq!(snap.selection_seq, 1);
    }

    /// Test: Unchanged text is not resolved again
    ///
    /// Scenario: The same name is on screen for several ticks.
    /// Expected: One selection write and one catalog fetch.
    #[test]
    fn test_unchanged_text_is_deduplicated() {
        let mut f = fixture(Duration::ZERO);
        lock(&f);
        f.screen.show("Dragon Fist Lee Sin");
        for _ in 0..5 {
            f.monitor.tick();
        }

        assert_eq!(f.screen.polls(), 5);
        assert_eq!(f.state.snapshot().selection_seq, 1);
        assert_eq!(f.client.catalog_fetches.load(Ordering::SeqCst), 1);
    }

    /// Test: Text below the similarity floor is ignored
    ///
    /// Scenario: OCR garbage that matches nothing.
    /// Expected: No selection recorded.
    #[test]
    fn test_unmatched_text_records_nothing() {
        let mut f = fixture(Duration::ZERO);
        lock(&f);
        f.screen.show("zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz");
        f.monitor.tick();

        assert_eq!(f.state.snapshot().last_hovered_cosmetic_id, None);
    }

    /// Test: A new lock re-arms the detector
    ///
    /// Scenario: Name detected, the selection is overwritten, then the champion is re-locked with the same name on screen.
    /// Expected: Detector reset and the unchanged name resolved again.
    #[test]
    fn test_new_lock_rearms_detection() {
        let mut f = fixture(Duration::ZERO);
        lock(&f);
        f.screen.show("Dragon Fist Lee Sin");
        f.monitor.tick();
        let resets = f.screen.resets();

        f.state.record_selection(64011, "God Fist Lee Sin", false);
        f.monitor.tick();
        assert_eq!(f.state.snapshot().last_hovered_cosmetic_id, Some(64011));

        f.state.record_lock(LEE_SIN, HashSet::new());
        f.monitor.tick();

        assert!(f.screen.resets() > resets);
        assert_eq!(f.state.snapshot().last_hovered_cosmetic_id, Some(64003));
    }

    /// Test: Detection stops once injection completes
    ///
    /// Scenario: Active detection, then the injection flag is raised.
    /// Expected: Monitor goes inactive, resets the detector, and stops polling.
    #[test]
    fn test_injection_completed_stops_detection() {
        let mut f = fixture(Duration::ZERO);
        lock(&f);
        f.screen.show("Dragon Fist Lee Sin");
        f.monitor.tick();
        assert!(f.monitor.is_active());

        f.state.set_injection_completed(true);
        let polls = f.screen.polls();
        f.monitor.tick();

        assert!(!f.monitor.is_active());
        assert_eq!(f.screen.polls(), polls);
    }

    /// Test: Detection stops inside the injection threshold
    ///
    /// Scenario: Finalization countdown at 250ms with a 300ms threshold.
    /// Expected: The detector is not polled.
    #[test]
    fn test_countdown_below_threshold_stops_detection() {
        let mut f = fixture(Duration::ZERO);
        lock(&f);
        f.state.set_countdown(true, Some(250));
        f.screen.show("Dragon Fist Lee Sin");
        f.monitor.tick();

        assert_eq!(f.screen.polls(), 0);
    }

    /// Test: Chroma navigation keeps the chroma, base change clears it
    ///
    /// Scenario: Dragon Fist with its Ruby chroma chosen, then God Fist is hovered outside the window.
    /// Expected: Chroma set by the chroma name, cleared after leaving the variant window.
    #[test]
    fn test_chroma_follows_variant_window() {
        let mut f = fixture(Duration::ZERO);
        lock(&f);
        f.screen.show("Dragon Fist Lee Sin");
        f.monitor.tick();
        f.screen.show("Dragon Fist Lee Sin Ruby");
        f.monitor.tick();

        let snap = f.state.snapshot();
        assert_eq!(snap.last_hovered_cosmetic_id, Some(64003));
        assert_eq!(snap.selected_chroma_id, Some(64004));

        f.screen.show("Lee Sin");
        f.monitor.tick();
        let snap = f.state.snapshot();
        assert_eq!(snap.last_hovered_cosmetic_id, Some(64000));
        assert_eq!(snap.selected_chroma_id, None);
    }

    /// Test: Language change reloads names
    ///
    /// Scenario: Names loaded in en_US, then the client switches to ko_KR.
    /// Expected: The next resolution fetches the catalog again.
    #[test]
    fn test_language_change_invalidates_catalog() {
        let mut f = fixture(Duration::ZERO);
        lock(&f);
        f.screen.show("Dragon Fist Lee Sin");
        f.monitor.tick();
        assert_eq!(f.client.catalog_fetches.load(Ordering::SeqCst), 1);

        assert!(f.catalog.set_language("ko_KR"));
        f.screen.show("God Fist Lee Sin");
        f.monitor.tick();
        assert_eq!(f.client.catalog_fetches.load(Ordering::SeqCst), 2);
        assert_eq!(f.state.snapshot().last_hovered_cosmetic_id, Some(64011));
    }
}
