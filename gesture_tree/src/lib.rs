//! # gesture_tree
//!
//! Interactive shell around [`ornament_core`]: a hand-landmark provider, the
//! decoupled detection cycle, a photo library and a software-rendered
//! particle view.
//!
//! ## Gesture → Mode mapping
//!
//! | Gesture | Mode |
//! |---|---|
//! | Closed fist | Aggregated (particles gather into the tree) |
//! | Open palm | Scattered (particles drift through the room) |
//! | Pinch | Focused (one photo flies to the camera) |
//! | No hand | unchanged |
//!
//! Tilting the hand turns the scattered cloud.
//!
//! ## Feature flags
//!
//! * default, **simulation mode**: keyboard shortcuts drive a synthetic hand.
//! * `mediapipe`: landmarks from a MediaPipe helper process
//!   (see `scripts/hand_landmarker.py`).
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Effect |
//! |---|---|
//! | `F` | Closed fist |
//! | `O` | Open palm |
//! | `P` | Pinch |
//! | `N` | Hand leaves the frame |
//! | `Left` / `Right` (hold) | Tilt the hand |
//! | `A` | Add a photo |
//! | `Q` / `Escape` | Quit |

pub mod error;
pub mod detect;
pub mod photos;
pub mod visualizer;
pub mod app;
