//! The choreographer: one owner for the particle set, the mode machine, the
//! focus selector and the animation driver.
//!
//! Gesture results go in through [`Choreographer::observe`], frames advance
//! through [`Choreographer::update`], and the renderer reads particles,
//! render states and the group transform back out.  No state is hidden in
//! globals; every per-frame value travels in a [`FrameInput`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::animate::{AnimationDriver, FrameInput, GroupTransform, MotionConfig, RenderState, ViewProvider};
use crate::geometry::{generate, LayoutSeeds, Particle, PhotoRef, TreeShape};
use crate::gesture::GestureResult;
use crate::mode::{DisplayMode, FocusSelector, ModeMachine, Transition};

// ════════════════════════════════════════════════════════════════════════════
// ChoreoConfig
// ════════════════════════════════════════════════════════════════════════════

/// What happens to scatter targets when the photo list changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScatterPolicy {
    /// Fresh scatter seed on every regeneration; every particle's scatter
    /// target moves.
    #[default]
    Reshuffle,
    /// Scatter seed fixed for the session; decorations keep their targets.
    Stable,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChoreoConfig {
    pub decorations: usize,
    pub shape:       TreeShape,
    pub motion:      MotionConfig,
    /// Seeds the layout stream, the scatter seed sequence and focus picks.
    pub seed:        u64,
    pub scatter:     ScatterPolicy,
}

impl Default for ChoreoConfig {
    fn default() -> Self {
        ChoreoConfig {
            decorations: 400,
            shape:       TreeShape::default(),
            motion:      MotionConfig::default(),
            seed:        0x0C7A_11E5,
            scatter:     ScatterPolicy::default(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Choreographer
// ════════════════════════════════════════════════════════════════════════════

pub struct Choreographer {
    config:    ChoreoConfig,
    photos:    Vec<PhotoRef>,
    particles: Vec<Particle>,
    machine:   ModeMachine,
    focus:     FocusSelector,
    driver:    AnimationDriver,
    seeds:     LayoutSeeds,
    /// Source of fresh scatter seeds under `ScatterPolicy::Reshuffle`.
    seed_rng:  StdRng,
    raw_tilt:  f32,
}

impl Choreographer {
    pub fn new(config: ChoreoConfig, photos: &[PhotoRef]) -> Self {
        let mut seed_rng = StdRng::seed_from_u64(config.seed ^ 0x5CA7_7E12);
        let seeds = LayoutSeeds { layout: config.seed, scatter: seed_rng.gen() };
        let particles = generate(photos, config.decorations, &config.shape, seeds);
        let driver = AnimationDriver::new(&particles, config.motion);

        log::info!(
            "choreographer ready: {} decorations, {} photos",
            config.decorations, photos.len()
        );

        Choreographer {
            config,
            photos:   photos.to_vec(),
            particles,
            machine:  ModeMachine::new(),
            focus:    FocusSelector::new(config.seed.rotate_left(17)),
            driver,
            seeds,
            seed_rng,
            raw_tilt: 0.0,
        }
    }

    // ── photo set changes ────────────────────────────────────────────────

    /// Regenerate the particle set if `photos` differs from the current list
    /// in length or identity.  Returns true when a regeneration happened.
    pub fn set_photos(&mut self, photos: &[PhotoRef]) -> bool {
        if photos == self.photos.as_slice() {
            return false;
        }

        if self.config.scatter == ScatterPolicy::Reshuffle {
            self.seeds.scatter = self.seed_rng.gen();
        }

        let particles = generate(photos, self.config.decorations, &self.config.shape, self.seeds);
        self.driver.rebind(&self.particles, &particles);
        self.particles = particles;
        self.photos = photos.to_vec();

        if !self.focus.revalidate(&self.particles) && self.mode() == DisplayMode::Focused {
            self.focus.select(&self.particles);
        }

        log::info!(
            "regenerated {} particles for {} photos ({:?} scatter)",
            self.particles.len(), self.photos.len(), self.config.scatter
        );
        true
    }

    // ── gestures ─────────────────────────────────────────────────────────

    /// Feed the latest classifier output.
    pub fn observe(&mut self, result: GestureResult) -> Transition {
        self.raw_tilt = result.tilt;

        let transition = self.machine.apply(result.label);
        if transition.entered(DisplayMode::Focused) {
            self.focus.select(&self.particles);
        } else if transition.left(DisplayMode::Focused) {
            self.focus.clear();
        }
        transition
    }

    // ── frames ───────────────────────────────────────────────────────────

    /// Advance one rendered frame of `delta` seconds.
    pub fn update(&mut self, delta: f32, view: &dyn ViewProvider) {
        let input = self.frame_input(delta, view);
        self.driver.step(&self.particles, &input);
    }

    pub fn frame_input(&self, delta: f32, view: &dyn ViewProvider) -> FrameInput {
        FrameInput {
            delta,
            mode:     self.mode(),
            focus:    self.focus_target(),
            raw_tilt: self.raw_tilt,
            camera:   view.camera_view(),
        }
    }

    // ── accessors for the render loop ────────────────────────────────────

    pub fn config(&self)        -> &ChoreoConfig    { &self.config }
    pub fn mode(&self)          -> DisplayMode      { self.machine.mode() }
    pub fn focus_target(&self)  -> Option<usize>    { self.focus.target() }
    pub fn particles(&self)     -> &[Particle]      { &self.particles }
    pub fn photos(&self)        -> &[PhotoRef]      { &self.photos }
    pub fn render_states(&self) -> &[RenderState]   { self.driver.states() }
    pub fn group(&self)         -> GroupTransform   { self.driver.group() }
    pub fn smoothed_tilt(&self) -> f32              { self.driver.smoothed_tilt() }
    pub fn raw_tilt(&self)      -> f32              { self.raw_tilt }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
