// End-to-end champion select scenarios, from lock to overlay activation

use super::test_helpers::*;

#[cfg(test)]
mod scenario_tests {
    use super::*;
    use crate::agent::{Agent, DetectorSlot};
    use crate::catalog::{CatalogEntry, Resolver, SkinCatalog};
    use crate::config::{AgentConfig, AgentPaths};
    use crate::injection::{BuildTarget, CoordinatorStatus, PrebuildCoordinator};
    use crate::monitors::detection::band::BandConfig;
    use crate::monitors::detection::ocr::{OcrBackend, OcrDetector, ScreenSource};
    use crate::monitors::detection::{DetectError, Gating, TextDetector};
    use crate::monitors::{ChampionMonitor, DetectionMonitor, LoadoutTicker, Monitor, PhaseMonitor, SelectionWatcher};
    use crate::state::{Phase, SharedState};
    use image::{GrayImage, Rgb, RgbImage};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    const CHAMPION: u32 = 157;
    const SETTLE: Duration = Duration::from_secs(3);

    struct Session<D: TextDetector> {
        client: Arc<MockClient>,
        builder: Arc<MockBuilder>,
        state: Arc<SharedState>,
        coordinator: PrebuildCoordinator,
        phase: PhaseMonitor,
        champion: ChampionMonitor,
        detection: DetectionMonitor<D>,
        selection: SelectionWatcher,
        ticker: LoadoutTicker,
    }

    impl<D: TextDetector> Session<D> {
        fn new(detector: D, catalog: Vec<CatalogEntry>) -> Self {
            let client = MockClient::new();
            client.set_catalog(CHAMPION, catalog);
            client.set_owned(&[157000]);
            let builder = MockBuilder::new(Duration::from_millis(20));
            let (coordinator, state) = coordinator_with(builder.clone());
            let tick = Duration::from_millis(10);

            let phase = PhaseMonitor::new(client.clone(), state.clone(), coordinator.clone(), tick);
            let champion = ChampionMonitor::new(
                client.clone(),
                client.clone(),
                state.clone(),
                coordinator.clone(),
                tick,
                Duration::from_secs(2),
            );
            let detection = DetectionMonitor::new(
                detector,
                state.clone(),
                Arc::new(SkinCatalog::new(client.clone())),
                Resolver::new(0.30),
                Gating {
                    grace: Duration::ZERO,
                    injection_threshold_ms: 300,
                },
                tick,
            );
            let selection = SelectionWatcher::new(state.clone(), coordinator.clone(), tick);
            let ticker = LoadoutTicker::new(client.clone(), state.clone(), coordinator.clone(), tick, 300);

            Self {
                client,
                builder,
                state,
                coordinator,
                phase,
                champion,
                detection,
                selection,
                ticker,
            }
        }

        fn tick_all(&mut self) {
            self.phase.tick();
            self.champion.tick();
            self.detection.tick();
            self.selection.tick();
            self.ticker.tick();
        }

        fn enter_and_lock(&mut self) {
            self.client.set_phase(Some(Phase::ChampSelect));
            self.client.set_timer("BAN_PICK", 20_000);
            self.tick_all();
            self.client.set_locked(Some(CHAMPION));
            self.client.set_timer("FINALIZATION", 30_000);
            self.tick_all();
        }
    }

    /// Test: UI detection through to activation
    ///
    /// Scenario: 157 locked owning only the base, "Dragon Fist" detected, countdown crosses the threshold.
    /// Expected: 157002 built, activated once, injection complete and detection stopped.
    #[test]
    fn test_ui_detection_to_activation() {
        let screen = Screen::default();
        let mut s = Session::new(screen.detector(), dragon_fist_catalog());
        s.enter_and_lock();
        assert_eq!(s.state.snapshot().locked_champion_id, Some(CHAMPION));

        screen.show("Dragon Fist");
        s.tick_all();
        assert_eq!(s.state.snapshot().last_hovered_cosmetic_id, Some(157002));
        assert_eq!(
            s.coordinator.wait_until_settled(SETTLE),
            CoordinatorStatus::Ready(BuildTarget::cosmetic(157002, None))
        );

        s.client.set_timer("FINALIZATION", 250);
        s.tick_all();

        assert_eq!(s.builder.activated(), vec![BuildTarget::cosmetic(157002, None)]);
        let snap = s.state.snapshot();
        assert!(snap.injection_completed);
        assert!(snap.loadout_countdown_active);

        let polls = screen.polls();
        s.tick_all();
        assert!(!s.detection.is_active());
        assert_eq!(screen.polls(), polls);
        assert_eq!(s.builder.activated().len(), 1);
    }

    struct Frame;

    impl ScreenSource for Frame {
        fn capture(&mut self) -> Result<Option<RgbImage>, DetectError> {
            Ok(Some(RgbImage::from_pixel(640, 360, Rgb([12, 12, 16]))))
        }
    }

    struct NoisyOcr;

    impl OcrBackend for NoisyOcr {
        fn recognize(&mut self, _image: &GrayImage) -> Result<String, DetectError> {
            Ok("Dragn\nFst ".to_string())
        }
    }

    /// Test: Noisy OCR still resolves
    ///
    /// Scenario: OCR reads "Dragn Fst" for the Dragon Fist skin.
    /// Expected: Resolved to 157002 and activated at the deadline like the UI path.
    #[test]
    fn test_noisy_ocr_to_activation() {
        let ocr = OcrDetector::new(Frame, NoisyOcr, BandConfig::default());
        let mut s = Session::new(ocr, dragon_fist_catalog());
        s.enter_and_lock();

        s.tick_all();
        assert_eq!(s.state.snapshot().last_hovered_cosmetic_id, Some(157002));
        s.coordinator.wait_until_settled(SETTLE);

        s.client.set_timer("FINALIZATION", 100);
        s.tick_all();
        assert_eq!(s.builder.activated(), vec![BuildTarget::cosmetic(157002, None)]);
        assert!(s.state.injection_completed());
    }

    /// Test: Chroma survives variant navigation and clears on base change
    ///
    /// Scenario: Dragon Fist with a chroma picked, hover to 157003, then back to the base 157000.
    /// Expected: Chroma kept on 157003, cleared on 157000 and the owned base needs no build.
    #[test]
    fn test_chroma_navigation() {
        let mut catalog = dragon_fist_catalog();
        catalog.push(CatalogEntry::chroma(157004, "Dragon Fist Jade", 157002));
        let screen = Screen::default();
        let mut s = Session::new(screen.detector(), catalog);
        s.enter_and_lock();

        screen.show("Dragon Fist");
        s.tick_all();
        screen.show("Dragon Fist Jade");
        s.tick_all();
        assert_eq!(s.state.snapshot().selected_chroma_id, Some(157004));
        assert!(wait_for(SETTLE, || s
            .builder
            .started()
            .contains(&BuildTarget::cosmetic(157002, Some(157004)))));

        screen.show("Dragon Fist Prestige");
        s.tick_all();
        let snap = s.state.snapshot();
        assert_eq!(snap.last_hovered_cosmetic_id, Some(157003));
        assert_eq!(snap.selected_chroma_id, Some(157004));

        screen.show("Classic");
        s.tick_all();
        let snap = s.state.snapshot();
        assert_eq!(snap.last_hovered_cosmetic_id, Some(157000));
        assert_eq!(snap.selected_chroma_id, None);
        assert_eq!(s.coordinator.status(), CoordinatorStatus::Ready(BuildTarget::cosmetic(157000, None)));
    }

    /// Test: Dodge and requeue
    ///
    /// Scenario: Build in flight, player dodges to lobby, then a new champ select locks the same champion.
    /// Expected: Old build cancelled, outputs purged, detection re-armed and a fresh build made.
    #[test]
    fn test_dodge_and_requeue() {
        let screen = Screen::default();
        let mut s = Session::new(screen.detector(), dragon_fist_catalog());
        s.builder.set_delay(Duration::from_millis(400));
        s.enter_and_lock();
        screen.show("Dragon Fist");
        s.tick_all();
        assert!(matches!(s.coordinator.status(), CoordinatorStatus::Building(_)));

        s.client.set_phase(Some(Phase::Lobby));
        s.client.set_locked(None);
        s.tick_all();
        assert_eq!(s.coordinator.status(), CoordinatorStatus::Idle);
        assert!(s.builder.purges.load(std::sync::atomic::Ordering::SeqCst) >= 1);

        s.builder.set_delay(Duration::from_millis(10));
        s.enter_and_lock();
        s.tick_all();
        assert_eq!(s.state.snapshot().lock_seq, 2);
        assert_eq!(s.state.snapshot().last_hovered_cosmetic_id, Some(157002));
        assert_eq!(
            s.coordinator.wait_until_settled(SETTLE),
            CoordinatorStatus::Ready(BuildTarget::cosmetic(157002, None))
        );
    }

    /// Test: Full agent on its own threads
    ///
    /// Scenario: Agent started with fast intervals; the mock client walks through a champ select.
    /// Expected: The detected skin is activated and history is written.
    #[test]
    fn test_agent_threads_end_to_end() {
        let dir = TempDir::new().unwrap();
        let paths = AgentPaths::new(dir.path().to_path_buf());
        let config = AgentConfig {
            phase_poll_ms: 5,
            champion_poll_ms: 5,
            detection_poll_ms: 5,
            ticker_poll_ms: 5,
            selection_poll_ms: 5,
            connection_poll_ms: 5,
            detection_grace_ms: 0,
            ..AgentConfig::default()
        };

        let client = MockClient::new();
        client.set_catalog(CHAMPION, dragon_fist_catalog());
        let builder = MockBuilder::new(Duration::from_millis(10));
        let screen = Screen::default();
        let slot = DetectorSlot {
            detector: Box::new(screen.detector()),
            min_similarity: 0.30,
            interval: Duration::from_millis(5),
        };
        let agent = Agent::start(client.clone(), builder.clone(), &config, &paths, vec![slot]).unwrap();

        client.set_phase(Some(Phase::ChampSelect));
        client.set_timer("FINALIZATION", 30_000);
        assert!(wait_for(SETTLE, || agent.state().phase() == Phase::ChampSelect));
        client.set_locked(Some(CHAMPION));
        screen.show("Dragon Fist");
        assert!(wait_for(SETTLE, || agent.coordinator().status()
            == CoordinatorStatus::Ready(BuildTarget::cosmetic(157002, None))));

        client.set_timer("FINALIZATION", 200);
        assert!(wait_for(SETTLE, || agent.state().injection_completed()));
        assert_eq!(builder.activated(), vec![BuildTarget::cosmetic(157002, None)]);
        assert!(agent.state().snapshot().connected);

        agent.shutdown();
        let history = std::fs::read_to_string(paths.historic_file()).unwrap();
        assert!(history.contains("157002"));
    }
}
