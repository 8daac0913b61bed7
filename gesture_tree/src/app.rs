//! Top-level application state.
//!
//! `AppState` owns the `Choreographer` and the `PhotoLibrary`.  It takes the
//! latest gesture from the detection slot, keeps the particle set in step
//! with the photo list, and advances the animation each frame.

use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::time::{Duration, Instant};

use ornament_core::{
    ChoreoConfig, Choreographer, ClassifierConfig, Gesture, GestureClassifier, GestureResult,
    PhotoRef, Transition, ViewProvider,
};

use crate::detect::{DetectionLoop, GestureSlot, SimHandSource, SimInput};
use crate::error::{AppError, AppResult};
use crate::photos::PhotoLibrary;
use crate::visualizer::{SceneCamera, UiCommand, Visualizer};

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub choreo:             ChoreoConfig,
    pub classifier:         ClassifierConfig,
    /// Directory of photos to hang on the tree at startup.
    pub photos_dir:         Option<PathBuf>,
    pub camera_distance:    f32,
    pub camera_height:      f32,
    /// Time between detection cycles.
    pub detection_interval: Duration,
    /// Helper script for the MediaPipe landmarker; `None` means simulate.
    #[cfg(feature = "mediapipe")]
    pub mediapipe_script:   Option<PathBuf>,
    #[cfg(feature = "mediapipe")]
    pub python:             String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            choreo:             ChoreoConfig::default(),
            classifier:         ClassifierConfig::default(),
            photos_dir:         None,
            camera_distance:    20.0,
            camera_height:      1.5,
            detection_interval: Duration::from_millis(33),
            #[cfg(feature = "mediapipe")]
            mediapipe_script:   None,
            #[cfg(feature = "mediapipe")]
            python:             "python3".to_string(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.detection_interval.is_zero() {
            return Err(AppError::Config("detection interval must be positive".into()));
        }
        let shape = &self.choreo.shape;
        if !(shape.height > 0.0 && shape.base_radius > 0.0) {
            return Err(AppError::Config(format!(
                "tree height and base radius must be positive (got {} and {})",
                shape.height, shape.base_radius
            )));
        }
        if !(self.camera_distance > 0.0) {
            return Err(AppError::Config("camera distance must be positive".into()));
        }
        if !(self.classifier.pinch_threshold > 0.0) {
            return Err(AppError::Config("pinch threshold must be positive".into()));
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    choreo:   Choreographer,
    library:  PhotoLibrary,
    /// Library revision the particle set was last built from.
    synced:   u64,
    gesture:  Gesture,
    added:    usize,
    status:   String,
}

impl AppState {
    pub fn new(cfg: &AppConfig, library: PhotoLibrary) -> Self {
        let choreo = Choreographer::new(cfg.choreo, library.photos());
        let status = format!(
            "Ready: {} decorations, {} photos",
            cfg.choreo.decorations, library.len()
        );
        AppState {
            choreo,
            synced:  library.revision(),
            library,
            gesture: Gesture::None,
            added:   0,
            status,
        }
    }

    // ── gestures ──────────────────────────────────────────────────────────

    pub fn handle_gesture(&mut self, result: GestureResult) {
        if result.label != self.gesture {
            log::debug!("gesture {} -> {}", self.gesture.name(), result.label.name());
            self.gesture = result.label;
        }

        if let Transition::Changed { from, to } = self.choreo.observe(result) {
            self.status = match self.choreo.focus_target() {
                Some(i) => format!("{} -> {}  (photo {})", from.name(), to.name(), i),
                None    => format!("{} -> {}", from.name(), to.name()),
            };
        }
    }

    // ── photos ────────────────────────────────────────────────────────────

    /// Hang a placeholder photo; stands in for an upload.
    pub fn add_photo(&mut self) {
        self.added += 1;
        self.library.push(PhotoRef::new(format!("added/photo-{:03}", self.added)));
        self.status = format!("Photo added ({} total)", self.library.len());
    }

    /// Rebuild the particle set if the library moved since the last sync.
    pub fn sync_photos(&mut self) -> bool {
        if self.library.revision() == self.synced {
            return false;
        }
        self.synced = self.library.revision();
        self.choreo.set_photos(self.library.photos())
    }

    // ── per-frame tick ────────────────────────────────────────────────────

    pub fn tick(&mut self, delta: f32, view: &dyn ViewProvider) {
        self.sync_photos();
        self.choreo.update(delta, view);
    }

    // ── accessors for the render loop ─────────────────────────────────────

    pub fn choreo(&self)  -> &Choreographer { &self.choreo }
    pub fn library(&self) -> &PhotoLibrary  { &self.library }
    pub fn gesture(&self) -> Gesture        { self.gesture }
    pub fn status(&self)  -> &str           { &self.status }
}

// ════════════════════════════════════════════════════════════════════════════
// run(): the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// Starts the detection cycle (MediaPipe helper when configured, keyboard
/// simulation otherwise), opens the visualizer and drives the render loop
/// at ~60 fps until the window closes.
pub fn run(cfg: AppConfig) -> AppResult<()> {
    cfg.validate()?;

    let library = match &cfg.photos_dir {
        Some(dir) => PhotoLibrary::from_dir(dir)?,
        None      => PhotoLibrary::new(),
    };

    // ── Detection cycle ───────────────────────────────────────────────────
    let slot = GestureSlot::new();
    let (mut detection, sim_tx) = start_detection(&cfg, slot.clone());

    // ── Visualizer ────────────────────────────────────────────────────────
    let camera = SceneCamera::new(cfg.camera_distance, cfg.camera_height);
    let mut vis = Visualizer::new(camera, sim_tx)?;

    // ── App state ─────────────────────────────────────────────────────────
    let mut app = AppState::new(&cfg, library);
    let mut last = Instant::now();

    // ── Main loop ─────────────────────────────────────────────────────────
    'frames: while vis.is_open() {
        for cmd in vis.poll_input() {
            match cmd {
                UiCommand::Quit     => break 'frames,
                UiCommand::AddPhoto => app.add_photo(),
            }
        }

        app.handle_gesture(slot.latest());

        let now = Instant::now();
        let delta = now.duration_since(last).as_secs_f32();
        last = now;

        app.tick(delta, vis.camera());
        vis.render(app.choreo(), app.status());
    }

    detection.stop();
    log::info!("window closed");
    Ok(())
}

/// Spawn the detection loop.  Returns the simulator's input channel when the
/// keyboard drives the hand.
fn start_detection(cfg: &AppConfig, slot: GestureSlot) -> (DetectionLoop, Option<Sender<SimInput>>) {
    let classifier = GestureClassifier::new(cfg.classifier);

    #[cfg(feature = "mediapipe")]
    if let Some(script) = &cfg.mediapipe_script {
        match crate::detect::MediaPipeSource::spawn(&cfg.python, script) {
            Ok(source) => {
                let dl = DetectionLoop::spawn(source, classifier, slot, cfg.detection_interval);
                return (dl, None);
            }
            Err(e) => log::warn!("hand tracking unavailable ({}); using keyboard simulation", e),
        }
    }

    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
    let dl = DetectionLoop::spawn(SimHandSource::new(sim_rx), classifier, slot, cfg.detection_interval);
    (dl, Some(sim_tx))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
