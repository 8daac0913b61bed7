//! Display-mode state machine and focus selection.
//!
//! | Gesture      | Mode after      |
//! |---|---|
//! | `ClosedFist` | `Aggregated`    |
//! | `OpenPalm`   | `Scattered`     |
//! | `Pinch`      | `Focused`       |
//! | `None`       | unchanged       |
//!
//! The machine starts in `Aggregated` and never terminates.  Entering
//! `Focused` is the only transition with a side effect: the caller hands it
//! to the [`FocusSelector`].

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::geometry::Particle;
use crate::gesture::Gesture;

// ════════════════════════════════════════════════════════════════════════════
// DisplayMode
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    #[default]
    Aggregated,
    Scattered,
    Focused,
}

impl DisplayMode {
    /// Mode a gesture asks for; `None` asks for nothing.
    pub fn for_gesture(gesture: Gesture) -> Option<DisplayMode> {
        match gesture {
            Gesture::ClosedFist => Some(DisplayMode::Aggregated),
            Gesture::OpenPalm   => Some(DisplayMode::Scattered),
            Gesture::Pinch      => Some(DisplayMode::Focused),
            Gesture::None       => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DisplayMode::Aggregated => "aggregated",
            DisplayMode::Scattered  => "scattered",
            DisplayMode::Focused    => "focused",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ModeMachine
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Stay,
    Changed { from: DisplayMode, to: DisplayMode },
}

impl Transition {
    pub fn entered(&self, mode: DisplayMode) -> bool {
        matches!(self, Transition::Changed { to, .. } if *to == mode)
    }

    pub fn left(&self, mode: DisplayMode) -> bool {
        matches!(self, Transition::Changed { from, .. } if *from == mode)
    }
}

/// Last-gesture-wins mode holder.
#[derive(Clone, Copy, Debug, Default)]
pub struct ModeMachine {
    mode: DisplayMode,
}

impl ModeMachine {
    pub fn new() -> Self { Self::default() }

    pub fn mode(&self) -> DisplayMode { self.mode }

    /// Feed one gesture label.  Repeats and `None` are no-ops.
    pub fn apply(&mut self, gesture: Gesture) -> Transition {
        match DisplayMode::for_gesture(gesture) {
            Some(to) if to != self.mode => {
                let from = self.mode;
                self.mode = to;
                log::info!("mode {} → {} ({})", from.name(), to.name(), gesture.name());
                Transition::Changed { from, to }
            }
            _ => Transition::Stay,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FocusSelector
// ════════════════════════════════════════════════════════════════════════════

/// Picks the photo slot to highlight in `Focused` mode.
#[derive(Clone, Debug)]
pub struct FocusSelector {
    rng:    StdRng,
    target: Option<usize>,
}

impl FocusSelector {
    pub fn new(seed: u64) -> Self {
        FocusSelector { rng: StdRng::seed_from_u64(seed), target: None }
    }

    /// Index of the highlighted photo particle, if any.
    pub fn target(&self) -> Option<usize> { self.target }

    /// Choose uniformly among the photo-slot indices of `particles`.
    /// Leaves the target empty when there are no photos.
    pub fn select(&mut self, particles: &[Particle]) -> Option<usize> {
        let photos: Vec<usize> = particles
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_photo())
            .map(|(i, _)| i)
            .collect();

        self.target = photos.choose(&mut self.rng).copied();
        match self.target {
            Some(i) => log::info!("focus → particle {} of {} photo slots", i, photos.len()),
            None    => log::info!("focus requested with no photos; showing scatter"),
        }
        self.target
    }

    pub fn clear(&mut self) { self.target = None; }

    /// Drop the target if it no longer names a photo slot.
    pub fn revalidate(&mut self, particles: &[Particle]) -> bool {
        let valid = self.target
            .map_or(true, |i| particles.get(i).is_some_and(Particle::is_photo));
        if !valid {
            self.target = None;
        }
        valid
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{generate, LayoutSeeds, PhotoRef, TreeShape};

    fn particles(photos: usize, decorations: usize) -> Vec<Particle> {
        let refs: Vec<PhotoRef> = (0..photos).map(|i| PhotoRef::new(i.to_string())).collect();
        generate(&refs, decorations, &TreeShape::default(), LayoutSeeds { layout: 1, scatter: 2 })
    }

    #[test]
    fn starts_aggregated() {
        assert_eq!(ModeMachine::new().mode(), DisplayMode::Aggregated);
    }

    #[test]
    fn gesture_table() {
        let mut m = ModeMachine::new();
        assert!(m.apply(Gesture::OpenPalm).entered(DisplayMode::Scattered));
        assert!(m.apply(Gesture::Pinch).entered(DisplayMode::Focused));
        assert!(m.apply(Gesture::ClosedFist).entered(DisplayMode::Aggregated));
    }

    #[test]
    fn none_is_sticky_and_repeats_idempotent() {
        let mut m = ModeMachine::new();
        m.apply(Gesture::OpenPalm);
        assert_eq!(m.apply(Gesture::None), Transition::Stay);
        assert_eq!(m.apply(Gesture::OpenPalm), Transition::Stay);
        assert_eq!(m.mode(), DisplayMode::Scattered);
    }

    #[test]
    fn fist_in_aggregated_is_noop() {
        let mut m = ModeMachine::new();
        assert_eq!(m.apply(Gesture::ClosedFist), Transition::Stay);
    }

    #[test]
    fn transition_left() {
        let mut m = ModeMachine::new();
        m.apply(Gesture::Pinch);
        assert!(m.apply(Gesture::OpenPalm).left(DisplayMode::Focused));
    }

    #[test]
    fn focus_only_picks_photos() {
        let ps = particles(5, 60);
        let mut f = FocusSelector::new(3);
        for _ in 0..200 {
            let i = f.select(&ps).unwrap();
            assert!(ps[i].is_photo());
        }
    }

    #[test]
    fn focus_covers_every_photo() {
        let ps = particles(4, 10);
        let mut f = FocusSelector::new(9);
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[f.select(&ps).unwrap()] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn focus_without_photos_is_none() {
        let mut f = FocusSelector::new(0);
        assert_eq!(f.select(&particles(0, 30)), None);
        assert_eq!(f.target(), None);
    }

    #[test]
    fn revalidate_drops_stale_index() {
        let mut f = FocusSelector::new(5);
        f.select(&particles(3, 5));
        assert!(f.target().is_some());
        assert!(!f.revalidate(&particles(0, 5)));
        assert_eq!(f.target(), None);
    }
}
