//! # ornament_core
//!
//! Gesture-driven choreography for an ornament tree: a few hundred
//! decorations and a handful of photo slots that gather into a cone, burst
//! into a floating cloud, or bring one photo up to the camera, depending on
//! what the user's hand is doing.
//!
//! ## Gesture → Mode mapping
//!
//! | Gesture | Mode | Layout |
//! |---|---|---|
//! | Closed fist | `Aggregated` | Golden-angle spiral on the cone |
//! | Open palm | `Scattered` | Fixed random points in a box, gently bobbing |
//! | Pinch | `Focused` | Scatter, plus one random photo locked 5 units in front of the camera at 4× scale |
//! | No hand | unchanged | - |
//!
//! Hand tilt (pinky knuckle vs. thumb base) steers the group's idle yaw
//! through a low-pass filter.
//!
//! ## Data flow
//!
//! ```text
//! landmarks ─▶ GestureClassifier ─▶ GestureResult ─▶ Choreographer::observe
//!                                                        │
//!                                     ModeMachine ◀──────┤
//!                                     FocusSelector ◀────┘ (on entering Focused)
//!
//! every frame: Choreographer::update(delta, camera) ─▶ AnimationDriver::step
//! ```
//!
//! ## Quick start
//!
//! ```rust
//! use ornament_core::{Choreographer, ChoreoConfig, CameraView, GestureClassifier};
//! use ornament_core::gesture::synth::{hand, Pose};
//! use glam::Vec3;
//!
//! let mut choreo = Choreographer::new(ChoreoConfig::default(), &[]);
//! let camera = CameraView { position: Vec3::new(0.0, 0.0, 20.0), forward: Vec3::NEG_Z };
//!
//! let classifier = GestureClassifier::default();
//! let palm = hand(Pose::OpenPalm, 0.0);
//! choreo.observe(classifier.classify(Some(&palm)));
//!
//! for _ in 0..60 {
//!     choreo.update(1.0 / 60.0, &camera);
//! }
//! assert_eq!(choreo.mode(), ornament_core::DisplayMode::Scattered);
//! ```

pub mod geometry;
pub mod gesture;
pub mod mode;
pub mod animate;
pub mod choreo;

pub use animate::{AnimationDriver, CameraView, FrameInput, GroupTransform, MotionConfig, RenderState, ViewProvider};
pub use choreo::{ChoreoConfig, Choreographer, ScatterPolicy};
pub use geometry::{LayoutSeeds, Ornament, Particle, ParticleId, ParticleKind, PhotoRef, TreeShape};
pub use gesture::{ClassifierConfig, Gesture, GestureClassifier, GestureResult, Landmark};
pub use mode::{DisplayMode, FocusSelector, ModeMachine, Transition};
