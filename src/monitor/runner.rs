//! The monitor loop.
//!
//! Each scan captures a frame, extracts the slot records, runs one tracking
//! cycle and hands the events to the reporters. Between scans the loop sleeps
//! in short steps so a stop request is honored within ~200ms.

use chrono::Local;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use super::report::{display_stats, Reporter};
use crate::capture::{save_screenshot, CaptureError, ImageSource};
use crate::config::MonitorConfig;
use crate::ocr::RegionExtractor;
use crate::rally::{RallyStore, RallyTracker};

/// Poll interval while waiting for the next scan.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Loop timing and output settings.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub scan_interval: Duration,
    /// Show statistics every N scans (0 = only at shutdown)
    pub stats_every_scans: u32,
    /// Where to save captured frames, if at all
    pub screenshot_dir: Option<PathBuf>,
}

impl MonitorSettings {
    pub fn from_config(config: &MonitorConfig, screenshot_dir: Option<PathBuf>) -> Self {
        Self {
            scan_interval: Duration::from_secs(config.scan_interval_secs),
            stats_every_scans: config.stats_every_scans,
            screenshot_dir: if config.save_screenshots {
                screenshot_dir
            } else {
                None
            },
        }
    }
}

pub struct RallyMonitor<S: ImageSource, E: RegionExtractor> {
    source: S,
    extractor: E,
    tracker: RallyTracker,
    store: RallyStore,
    reporters: Vec<Box<dyn Reporter>>,
    settings: MonitorSettings,
    scan_count: u64,
}

impl<S: ImageSource, E: RegionExtractor> RallyMonitor<S, E> {
    pub fn new(source: S, extractor: E, tracker: RallyTracker, settings: MonitorSettings) -> Self {
        Self {
            source,
            extractor,
            tracker,
            store: RallyStore::new(),
            reporters: Vec::new(),
            settings,
            scan_count: 0,
        }
    }

    pub fn add_reporter(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    #[cfg(test)]
    pub fn store(&self) -> &RallyStore {
        &self.store
    }

    #[cfg(test)]
    pub fn scan_count(&self) -> u64 {
        self.scan_count
    }

    /// Runs one scan. Returns the number of events reported.
    ///
    /// A capture failure leaves the store untouched: no records, no sweep.
    pub fn scan_once(&mut self) -> Result<usize, CaptureError> {
        self.scan_count += 1;
        info!("Scan #{}", self.scan_count);

        let frame = self.source.capture()?;

        if let Some(dir) = &self.settings.screenshot_dir {
            if let Err(e) = save_screenshot(&frame, dir) {
                warn!("{:#}", e);
            }
        }

        let batch = self.extractor.extract_all(&frame);
        let events = self.tracker.run_cycle(&mut self.store, batch, Local::now());

        for reporter in &mut self.reporters {
            reporter.report(self.scan_count, &events);
        }
        Ok(events.len())
    }

    /// Scans until `stop` is set. Statistics are shown periodically and
    /// once more on the way out.
    pub fn run(&mut self, stop: &AtomicBool) {
        info!(
            "Monitoring {} slot(s) every {}s (Ctrl+C to stop)",
            self.extractor.slot_count(),
            self.settings.scan_interval.as_secs()
        );

        while !stop.load(Ordering::SeqCst) {
            match self.scan_once() {
                Ok(0) => {}
                Ok(n) => info!("Scan #{}: {} event(s)", self.scan_count, n),
                Err(e) => warn!("Scan #{} skipped: {}", self.scan_count, e),
            }

            let every = u64::from(self.settings.stats_every_scans);
            if every > 0 && self.scan_count % every == 0 {
                display_stats(&self.store);
            }

            if !wait_for_next_scan(self.settings.scan_interval, stop) {
                break;
            }
        }

        info!("Stopping rally monitor after {} scan(s)", self.scan_count);
        display_stats(&self.store);
    }
}

/// Sleeps for `interval` in short steps.
///
/// Returns false as soon as `stop` is set.
pub fn wait_for_next_scan(interval: Duration, stop: &AtomicBool) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(STOP_POLL_INTERVAL.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rally::{RallyEvent, RawSlotRecord};
    use image::RgbaImage;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::sync::Arc;

    /// Frame source that fails on the listed capture numbers and can raise
    /// the stop flag after a number of captures.
    struct FakeSource {
        captures: u32,
        fail_on: Vec<u32>,
        stop_after: Option<(u32, Arc<AtomicBool>)>,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                captures: 0,
                fail_on: Vec::new(),
                stop_after: None,
            }
        }
    }

    impl ImageSource for FakeSource {
        fn capture(&mut self) -> Result<RgbaImage, CaptureError> {
            self.captures += 1;
            if let Some((n, stop)) = &self.stop_after {
                if self.captures >= *n {
                    stop.store(true, Ordering::SeqCst);
                }
            }
            if self.fail_on.contains(&self.captures) {
                return Err(CaptureError::EmptyFrame);
            }
            Ok(RgbaImage::new(4, 4))
        }
    }

    /// Extractor that replays one scripted batch per scan.
    struct ScriptedExtractor {
        batches: RefCell<VecDeque<Vec<RawSlotRecord>>>,
    }

    impl ScriptedExtractor {
        fn new(batches: Vec<Vec<RawSlotRecord>>) -> Self {
            Self {
                batches: RefCell::new(batches.into()),
            }
        }
    }

    impl RegionExtractor for ScriptedExtractor {
        fn extract(&self, _img: &RgbaImage, _slot_index: usize) -> Option<RawSlotRecord> {
            None
        }

        fn slot_count(&self) -> usize {
            3
        }

        fn extract_all(&self, _img: &RgbaImage) -> Vec<RawSlotRecord> {
            self.batches.borrow_mut().pop_front().unwrap_or_default()
        }
    }

    /// Reporter that keeps every event kind with its scan number.
    struct CollectingReporter(Rc<RefCell<Vec<(u64, &'static str)>>>);

    impl Reporter for CollectingReporter {
        fn report(&mut self, scan: u64, events: &[RallyEvent]) {
            self.0
                .borrow_mut()
                .extend(events.iter().map(|e| (scan, e.kind())));
        }
    }

    fn settings() -> MonitorSettings {
        MonitorSettings {
            scan_interval: Duration::ZERO,
            stats_every_scans: 0,
            screenshot_dir: None,
        }
    }

    fn goku(status: &str) -> RawSlotRecord {
        RawSlotRecord::new(0, "[D08K]DKGoku F2P", "Lvl 3 Barbarian Fort", status)
    }

    #[test]
    fn test_scan_once_reports_events() {
        let extractor = ScriptedExtractor::new(vec![
            vec![goku("Preparing")],
            vec![goku("Marching")],
            vec![],
        ]);
        let mut monitor =
            RallyMonitor::new(FakeSource::new(), extractor, RallyTracker::default(), settings());
        let seen = Rc::new(RefCell::new(Vec::new()));
        monitor.add_reporter(Box::new(CollectingReporter(seen.clone())));

        assert_eq!(monitor.scan_once().unwrap(), 1);
        assert_eq!(monitor.scan_once().unwrap(), 1);
        assert_eq!(monitor.scan_once().unwrap(), 1);

        assert_eq!(
            *seen.borrow(),
            vec![(1, "new"), (2, "status_changed"), (3, "completed")]
        );
        assert!(monitor.store().is_empty());
        assert_eq!(monitor.store().count_for("[D08K]DKGoku F2P"), 1);
    }

    #[test]
    fn test_capture_failure_skips_cycle() {
        let mut source = FakeSource::new();
        source.fail_on = vec![2];
        let extractor = ScriptedExtractor::new(vec![vec![goku("Preparing")], vec![goku("Preparing")]]);
        let mut monitor = RallyMonitor::new(source, extractor, RallyTracker::default(), settings());

        monitor.scan_once().unwrap();
        assert!(matches!(monitor.scan_once(), Err(CaptureError::EmptyFrame)));

        // No sweep happened: the rally is still active
        assert_eq!(monitor.store().len(), 1);
        assert_eq!(monitor.scan_count(), 2);

        // The next successful scan sees the same rally, no new event
        assert_eq!(monitor.scan_once().unwrap(), 0);
        assert_eq!(monitor.store().len(), 1);
    }

    #[test]
    fn test_run_stops_on_flag() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut source = FakeSource::new();
        source.stop_after = Some((2, stop.clone()));
        let extractor = ScriptedExtractor::new(vec![vec![goku("Preparing")]]);
        let mut monitor = RallyMonitor::new(source, extractor, RallyTracker::default(), settings());

        monitor.run(&stop);

        assert_eq!(monitor.scan_count(), 2);
    }

    #[test]
    fn test_run_with_stop_already_set() {
        let stop = AtomicBool::new(true);
        let mut monitor = RallyMonitor::new(
            FakeSource::new(),
            ScriptedExtractor::new(vec![]),
            RallyTracker::default(),
            settings(),
        );

        monitor.run(&stop);

        assert_eq!(monitor.scan_count(), 0);
    }

    #[test]
    fn test_wait_for_next_scan() {
        let stop = AtomicBool::new(false);
        assert!(wait_for_next_scan(Duration::from_millis(10), &stop));

        stop.store(true, Ordering::SeqCst);
        let started = Instant::now();
        assert!(!wait_for_next_scan(Duration::from_secs(30), &stop));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_settings_from_config() {
        let config = MonitorConfig {
            save_screenshots: false,
            ..Default::default()
        };
        let settings = MonitorSettings::from_config(&config, Some(PathBuf::from("shots")));

        assert_eq!(settings.scan_interval, Duration::from_secs(30));
        assert_eq!(settings.stats_every_scans, 5);
        assert!(settings.screenshot_dir.is_none());
    }
}
