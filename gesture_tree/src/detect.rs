//! Hand detection from a MediaPipe helper process or keyboard simulation.
//!
//! The detection cycle runs on its own thread, decoupled from the render
//! frame rate.  It polls a [`LandmarkProvider`], classifies each *new* video
//! frame (strictly increasing timestamp) and publishes the result into a
//! [`GestureSlot`].  The render loop reads whatever is in the slot; there is
//! no queue, the last writer wins.
//!
//! Consumers don't need to know whether landmarks came from a camera or the
//! keyboard simulator.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use ornament_core::gesture::synth::{self, Pose};
use ornament_core::{GestureClassifier, GestureResult, Landmark};

// ════════════════════════════════════════════════════════════════════════════
// Detection / LandmarkProvider
// ════════════════════════════════════════════════════════════════════════════

/// What a provider has to say on one poll.
#[derive(Clone, Debug, PartialEq)]
pub enum Detection {
    /// Model not loaded, camera gone, helper crashed.
    Unavailable,
    /// No video frame newer than the last one.
    Pending,
    /// A video frame was processed.  `hand` is `None` when no hand was seen.
    Frame {
        timestamp_ms: u64,
        hand:         Option<Vec<Landmark>>,
    },
}

/// Anything that can deliver hand landmarks for the latest video frame.
///
/// `poll` must return promptly; a provider fed by a blocking source reads it
/// on its own thread (see [`LatestLine`]).
pub trait LandmarkProvider: Send + 'static {
    fn poll(&mut self) -> Detection;
}

// ════════════════════════════════════════════════════════════════════════════
// GestureSlot: single most-recent value
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct GestureSlot {
    inner: Arc<Mutex<GestureResult>>,
}

impl GestureSlot {
    pub fn new() -> Self { Self::default() }

    pub fn publish(&self, result: GestureResult) {
        *self.inner.lock() = result;
    }

    pub fn latest(&self) -> GestureResult {
        *self.inner.lock()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// One detection cycle
// ════════════════════════════════════════════════════════════════════════════

/// Poll `provider` once.  Returns the result to publish, or `None` when there
/// was no new frame.
pub fn detect_once<P: LandmarkProvider + ?Sized>(
    provider:   &mut P,
    classifier: &GestureClassifier,
    last_ts:    &mut Option<u64>,
) -> Option<GestureResult> {
    match provider.poll() {
        Detection::Unavailable => Some(GestureResult::NONE),
        Detection::Pending     => None,
        Detection::Frame { timestamp_ms, hand } => {
            if last_ts.is_some_and(|t| timestamp_ms <= t) {
                log::trace!("stale frame {} skipped", timestamp_ms);
                return None;
            }
            *last_ts = Some(timestamp_ms);
            Some(classifier.classify(hand.as_deref()))
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// DetectionLoop: the repeating schedule
// ════════════════════════════════════════════════════════════════════════════

/// Handle to the detection thread.  Dropping it stops the schedule.
pub struct DetectionLoop {
    stop:   Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DetectionLoop {
    /// Spawn the detection cycle on its own thread.
    pub fn spawn<P: LandmarkProvider>(
        mut provider: P,
        classifier:   GestureClassifier,
        slot:         GestureSlot,
        interval:     Duration,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            log::info!("detection cycle started ({:?} interval)", interval);
            let mut last_ts = None;
            let mut last_label = None;

            while !flag.load(Ordering::Acquire) {
                if let Some(result) = detect_once(&mut provider, &classifier, &mut last_ts) {
                    if last_label != Some(result.label) {
                        log::debug!("gesture: {}", result.label.name());
                        last_label = Some(result.label);
                    }
                    slot.publish(result);
                }
                thread::sleep(interval);
            }
            log::info!("detection cycle stopped");
        });

        DetectionLoop { stop, handle: Some(handle) }
    }

    /// Stop scheduling further cycles and wait for the thread.  A cycle that
    /// is already classifying is allowed to finish; providers never block in
    /// `poll`, so the wait is at most one cycle.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                log::warn!("detection thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool { self.handle.is_some() }
}

impl Drop for DetectionLoop {
    fn drop(&mut self) { self.stop(); }
}

// ════════════════════════════════════════════════════════════════════════════
// SimHandSource: keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the simulation window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// Show a hand in this pose, or take the hand away.
    Hand(Option<Pose>),
    /// Nudge the hand's tilt.
    TiltBy(f32),
}

/// Synthesises a 21-landmark hand from [`SimInput`] events sent by the
/// visualizer's window.  Every poll is a fresh "video frame".
pub struct SimHandSource {
    rx:      Receiver<SimInput>,
    pose:    Option<Pose>,
    tilt:    f32,
    started: Instant,
    last_ts: u64,
}

impl SimHandSource {
    pub fn new(rx: Receiver<SimInput>) -> Self {
        SimHandSource { rx, pose: None, tilt: 0.0, started: Instant::now(), last_ts: 0 }
    }

    fn apply(&mut self, input: SimInput) {
        match input {
            SimInput::Hand(pose) => self.pose = pose,
            SimInput::TiltBy(d)  => self.tilt = (self.tilt + d).clamp(-1.0, 1.0),
        }
    }
}

impl LandmarkProvider for SimHandSource {
    fn poll(&mut self) -> Detection {
        while let Ok(input) = self.rx.try_recv() {
            self.apply(input);
        }

        let elapsed = self.started.elapsed().as_millis() as u64;
        self.last_ts = elapsed.max(self.last_ts + 1);

        Detection::Frame {
            timestamp_ms: self.last_ts,
            hand:         self.pose.map(|p| synth::hand(p, self.tilt)),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LatestLine: newest line of a blocking stream
// ════════════════════════════════════════════════════════════════════════════

/// Reads a line-oriented stream on its own thread and keeps only the newest
/// line.  Lines that arrive between two takes are overwritten, so a slow
/// consumer always sees the most recent frame instead of a backlog.
pub struct LatestLine {
    latest:   Arc<Mutex<Option<String>>>,
    open:     Arc<AtomicBool>,
    received: Arc<AtomicU64>,
}

impl LatestLine {
    /// The reader thread is detached; it ends at end of stream or on the
    /// first read error.
    pub fn spawn<R: BufRead + Send + 'static>(reader: R) -> Self {
        let latest   = Arc::new(Mutex::new(None));
        let open     = Arc::new(AtomicBool::new(true));
        let received = Arc::new(AtomicU64::new(0));

        let (slot, flag, count) = (Arc::clone(&latest), Arc::clone(&open), Arc::clone(&received));
        thread::spawn(move || {
            for line in reader.lines() {
                match line {
                    Ok(l) => {
                        *slot.lock() = Some(l);
                        count.fetch_add(1, Ordering::Release);
                    }
                    Err(e) => {
                        log::warn!("line reader stopped: {}", e);
                        break;
                    }
                }
            }
            flag.store(false, Ordering::Release);
        });

        LatestLine { latest, open, received }
    }

    /// The newest unread line, if any.
    pub fn take(&self) -> Option<String> { self.latest.lock().take() }

    pub fn is_open(&self) -> bool { self.open.load(Ordering::Acquire) }

    /// Lines read so far, including overwritten ones.
    pub fn received(&self) -> u64 { self.received.load(Ordering::Acquire) }

    /// Newest line parsed by `parse`; `Pending` when nothing new arrived,
    /// `Unavailable` once the stream has ended and been drained.
    pub fn poll_with(&self, parse: impl FnOnce(&str) -> Detection) -> Detection {
        let open = self.is_open();
        match self.take() {
            Some(line)     => parse(&line),
            None if open   => Detection::Pending,
            None           => Detection::Unavailable,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MediaPipeSource: hand landmarker helper process (feature = "mediapipe")
// ════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "mediapipe")]
pub use mediapipe::{parse_frame, MediaPipeSource};

#[cfg(feature = "mediapipe")]
mod mediapipe {
    use std::io::{BufRead, BufReader};
    use std::path::Path;
    use std::process::{Child, Command, Stdio};

    use serde::Deserialize;

    use super::{Detection, LandmarkProvider, LatestLine};
    use crate::error::{AppError, AppResult};
    use ornament_core::Landmark;

    /// Minimum handedness score for a hand to count.
    const MIN_SCORE: f32 = 0.5;

    #[derive(Deserialize, Debug)]
    struct LandmarkJson {
        x: f32,
        y: f32,
        #[serde(default)]
        z: f32,
    }

    #[derive(Deserialize, Debug)]
    struct HandJson {
        score:     f32,
        landmarks: Vec<LandmarkJson>,
    }

    #[derive(Deserialize, Debug)]
    struct FrameJson {
        timestamp_ms: u64,
        #[serde(default)]
        hands:        Vec<HandJson>,
        #[serde(default)]
        error:        Option<String>,
    }

    /// Parse one JSON line from the helper.
    ///
    /// The first hand at or above `min_score` wins; its landmark list is
    /// passed through as-is and the classifier decides whether it is usable.
    pub fn parse_frame(line: &str, min_score: f32) -> Detection {
        let frame: FrameJson = match serde_json::from_str(line) {
            Ok(f)  => f,
            Err(e) => {
                log::warn!("unparseable landmark frame: {}", e);
                return Detection::Pending;
            }
        };
        if let Some(err) = frame.error {
            log::warn!("landmarker error: {}", err);
            return Detection::Frame { timestamp_ms: frame.timestamp_ms, hand: None };
        }

        let hand = frame.hands
            .into_iter()
            .find(|h| h.score >= min_score)
            .map(|h| h.landmarks.into_iter().map(|l| Landmark::new(l.x, l.y, l.z)).collect());

        Detection::Frame { timestamp_ms: frame.timestamp_ms, hand }
    }

    /// Runs a helper script that owns the camera and the MediaPipe hand
    /// landmarker, printing `READY` and then one JSON object per frame.
    pub struct MediaPipeSource {
        process: Child,
        lines:   LatestLine,
        gone:    bool,
    }

    impl MediaPipeSource {
        pub fn spawn(python: &str, script: &Path) -> AppResult<Self> {
            if !script.exists() {
                return Err(AppError::Provider(format!("helper script not found at {}", script.display())));
            }

            log::info!("starting MediaPipe helper {}", script.display());
            let mut process = Command::new(python)
                .arg(script)
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .spawn()?;

            let stdout = process.stdout.take()
                .ok_or_else(|| AppError::Provider("helper has no stdout".into()))?;
            let mut reader = BufReader::new(stdout);

            let mut ready = String::new();
            reader.read_line(&mut ready)?;
            if ready.trim() != "READY" {
                let _ = process.kill();
                let _ = process.wait();
                return Err(AppError::Provider(format!("helper did not signal ready, got {:?}", ready.trim())));
            }
            log::info!("MediaPipe helper ready");

            Ok(MediaPipeSource { process, lines: LatestLine::spawn(reader), gone: false })
        }
    }

    impl LandmarkProvider for MediaPipeSource {
        fn poll(&mut self) -> Detection {
            let detection = self.lines.poll_with(|line| parse_frame(line, MIN_SCORE));
            if detection == Detection::Unavailable && !self.gone {
                log::warn!("MediaPipe helper went away; no more hands");
                self.gone = true;
            }
            detection
        }
    }

    impl Drop for MediaPipeSource {
        fn drop(&mut self) {
            // closes the pipe, which ends the reader thread
            let _ = self.process.kill();
            let _ = self.process.wait();
            log::debug!("MediaPipe helper stopped after {} frames", self.lines.received());
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn landmarks_json(n: usize) -> String {
            let pts: Vec<String> = (0..n).map(|i| format!(r#"{{"x":{},"y":0.5,"z":0.0}}"#, i as f32 / 40.0)).collect();
            format!("[{}]", pts.join(","))
        }

        #[test]
        fn picks_first_confident_hand() {
            let line = format!(
                r#"{{"timestamp_ms":12,"hands":[{{"score":0.2,"landmarks":[]}},{{"score":0.9,"landmarks":{}}}]}}"#,
                landmarks_json(21)
            );
            match parse_frame(&line, MIN_SCORE) {
                Detection::Frame { timestamp_ms, hand: Some(h) } => {
                    assert_eq!(timestamp_ms, 12);
                    assert_eq!(h.len(), 21);
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        #[test]
        fn no_hands_is_empty_frame() {
            assert_eq!(
                parse_frame(r#"{"timestamp_ms":3,"hands":[]}"#, MIN_SCORE),
                Detection::Frame { timestamp_ms: 3, hand: None }
            );
        }

        #[test]
        fn garbage_is_pending() {
            assert_eq!(parse_frame("not json", MIN_SCORE), Detection::Pending);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use ornament_core::Gesture;
    use std::collections::VecDeque;
    use std::sync::mpsc;

    /// Replays a fixed script of detections, then reports `Pending`.
    struct Scripted(VecDeque<Detection>);

    impl LandmarkProvider for Scripted {
        fn poll(&mut self) -> Detection {
            self.0.pop_front().unwrap_or(Detection::Pending)
        }
    }

    fn frame(ts: u64, pose: Option<Pose>) -> Detection {
        Detection::Frame { timestamp_ms: ts, hand: pose.map(|p| synth::hand(p, 0.0)) }
    }

    #[test]
    fn classifies_new_frames_only() {
        let mut p = Scripted(VecDeque::from(vec![
            frame(10, Some(Pose::Fist)),
            frame(10, Some(Pose::Pinch)),
            frame(9,  Some(Pose::Pinch)),
            frame(11, Some(Pose::OpenPalm)),
        ]));
        let c = GestureClassifier::default();
        let mut ts = None;

        assert_eq!(detect_once(&mut p, &c, &mut ts).map(|r| r.label), Some(Gesture::ClosedFist));
        assert_eq!(detect_once(&mut p, &c, &mut ts), None);
        assert_eq!(detect_once(&mut p, &c, &mut ts), None);
        assert_eq!(detect_once(&mut p, &c, &mut ts).map(|r| r.label), Some(Gesture::OpenPalm));
        assert_eq!(ts, Some(11));
    }

    #[test]
    fn unavailable_provider_means_no_hand() {
        let mut p = Scripted(VecDeque::from(vec![Detection::Unavailable]));
        let r = detect_once(&mut p, &GestureClassifier::default(), &mut None);
        assert_eq!(r, Some(GestureResult::NONE));
    }

    #[test]
    fn malformed_hand_means_no_hand() {
        let mut p = Scripted(VecDeque::from(vec![Detection::Frame {
            timestamp_ms: 1,
            hand: Some(vec![Landmark::default(); 7]),
        }]));
        let r = detect_once(&mut p, &GestureClassifier::default(), &mut None);
        assert_eq!(r, Some(GestureResult::NONE));
    }

    #[test]
    fn slot_keeps_last_value() {
        let slot = GestureSlot::new();
        assert_eq!(slot.latest(), GestureResult::NONE);
        slot.publish(GestureResult { label: Gesture::Pinch, tilt: 0.1 });
        slot.publish(GestureResult { label: Gesture::OpenPalm, tilt: -0.2 });
        assert_eq!(slot.latest(), GestureResult { label: Gesture::OpenPalm, tilt: -0.2 });
    }

    #[test]
    fn sim_source_timestamps_strictly_increase() {
        let (_tx, rx) = mpsc::channel();
        let mut sim = SimHandSource::new(rx);
        let mut last = 0;
        for _ in 0..50 {
            match sim.poll() {
                Detection::Frame { timestamp_ms, hand } => {
                    assert!(timestamp_ms > last);
                    assert!(hand.is_none());
                    last = timestamp_ms;
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn sim_source_follows_inputs() {
        let (tx, rx) = mpsc::channel();
        let mut sim = SimHandSource::new(rx);
        tx.send(SimInput::Hand(Some(Pose::Fist))).unwrap();
        tx.send(SimInput::TiltBy(0.3)).unwrap();
        tx.send(SimInput::TiltBy(0.3)).unwrap();

        let c = GestureClassifier::default();
        let r = detect_once(&mut sim, &c, &mut None).unwrap();
        assert_eq!(r.label, Gesture::ClosedFist);
        assert!((r.tilt - 0.6).abs() < 1e-4);

        tx.send(SimInput::TiltBy(5.0)).unwrap();
        let r = detect_once(&mut sim, &c, &mut None).unwrap();
        assert!((r.tilt - 1.0).abs() < 1e-4);
    }

    #[test]
    fn loop_publishes_then_stops() {
        let (tx, rx) = mpsc::channel();
        tx.send(SimInput::Hand(Some(Pose::Pinch))).unwrap();

        let slot = GestureSlot::new();
        let mut dl = DetectionLoop::spawn(
            SimHandSource::new(rx),
            GestureClassifier::default(),
            slot.clone(),
            Duration::from_millis(1),
        );

        let deadline = Instant::now() + Duration::from_secs(5);
        while slot.latest().label != Gesture::Pinch && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(slot.latest().label, Gesture::Pinch);

        dl.stop();
        assert!(!dl.is_running());

        // no further classification after stop
        slot.publish(GestureResult::NONE);
        let _ = tx.send(SimInput::Hand(Some(Pose::Fist)));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(slot.latest(), GestureResult::NONE);
    }

    // ── line-fed providers ────────────────────────────────────────────────

    /// A blocking `Read` fed chunk by chunk over a channel; end of stream
    /// once every sender is gone.
    struct ChannelReader {
        rx:  mpsc::Receiver<Vec<u8>>,
        buf: Vec<u8>,
        pos: usize,
    }

    impl std::io::Read for ChannelReader {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            if self.pos == self.buf.len() {
                match self.rx.recv() {
                    Ok(chunk) => { self.buf = chunk; self.pos = 0; }
                    Err(_)    => return Ok(0),
                }
            }
            let n = out.len().min(self.buf.len() - self.pos);
            out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn channel_lines() -> (mpsc::Sender<Vec<u8>>, LatestLine) {
        let (tx, rx) = mpsc::channel();
        let reader = std::io::BufReader::new(ChannelReader { rx, buf: Vec::new(), pos: 0 });
        (tx, LatestLine::spawn(reader))
    }

    /// Each line is a bare timestamp; no hand.
    struct TimestampLines(LatestLine);

    impl LandmarkProvider for TimestampLines {
        fn poll(&mut self) -> Detection {
            self.0.poll_with(|line| match line.trim().parse() {
                Ok(ts) => Detection::Frame { timestamp_ms: ts, hand: None },
                Err(_) => Detection::Pending,
            })
        }
    }

    fn wait_for(what: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !what() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        assert!(what(), "timed out");
    }

    #[test]
    fn burst_of_frames_classifies_the_newest() {
        let (tx, lines) = channel_lines();
        for ts in 1..=200u64 {
            tx.send(format!("{}\n", ts).into_bytes()).unwrap();
        }
        wait_for(|| lines.received() == 200);

        let mut p = TimestampLines(lines);
        let c = GestureClassifier::default();
        let mut last_ts = None;

        assert_eq!(detect_once(&mut p, &c, &mut last_ts), Some(GestureResult::NONE));
        assert_eq!(last_ts, Some(200));
        // nothing newer yet
        assert_eq!(detect_once(&mut p, &c, &mut last_ts), None);

        tx.send(b"201\n".to_vec()).unwrap();
        wait_for(|| p.0.received() == 201);
        detect_once(&mut p, &c, &mut last_ts);
        assert_eq!(last_ts, Some(201));
    }

    #[test]
    fn ended_stream_drains_then_reports_unavailable() {
        let lines = LatestLine::spawn(std::io::Cursor::new(b"1\n2\n3\n".to_vec()));
        wait_for(|| !lines.is_open());

        let mut p = TimestampLines(lines);
        assert_eq!(p.poll(), Detection::Frame { timestamp_ms: 3, hand: None });
        assert_eq!(p.poll(), Detection::Unavailable);
    }

    #[test]
    fn stop_returns_while_stream_is_stalled() {
        // sender kept alive and silent: the reader thread stays blocked
        let (tx, lines) = channel_lines();
        let mut dl = DetectionLoop::spawn(
            TimestampLines(lines),
            GestureClassifier::default(),
            GestureSlot::new(),
            Duration::from_millis(5),
        );
        thread::sleep(Duration::from_millis(30));

        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || {
            dl.stop();
            let _ = done_tx.send(());
        });
        assert!(done_rx.recv_timeout(Duration::from_secs(2)).is_ok(), "stop() hung");
        drop(tx);
    }
}
