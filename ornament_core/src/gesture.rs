//! Hand-gesture classification.
//!
//! [`GestureClassifier::classify`] turns one frame's hand landmarks into a
//! [`GestureResult`]: a discrete [`Gesture`] label plus a continuous tilt.
//! It is a pure function of its input with no memory of earlier frames.
//!
//! # Rules (first match wins)
//!
//! 1. No hand, fewer than 21 landmarks, or a non-finite coordinate → `None`.
//! 2. Thumb tip to index tip closer than `pinch_threshold` → `Pinch`.
//! 3. At least `fold_quorum` of the four fingers folded (tip nearer the
//!    wrist than the finger's knuckle) → `ClosedFist`, otherwise `OpenPalm`.
//!
//! Tilt is `(pinky_mcp.y − thumb_cmc.y) × tilt_gain`, clamped to `[-1, 1]`,
//! and is 0 whenever there is no usable hand.

/// Hand landmark indices (MediaPipe hand landmark model convention).
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_MCP: usize = 5;
    pub const INDEX_FINGER_PIP: usize = 6;
    pub const INDEX_FINGER_DIP: usize = 7;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_MCP: usize = 9;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_DIP: usize = 11;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_MCP: usize = 13;
    pub const RING_FINGER_PIP: usize = 14;
    pub const RING_FINGER_DIP: usize = 15;
    pub const RING_FINGER_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;

    /// `(tip, knuckle)` pairs of the four non-thumb fingers.
    pub const FINGERS: [(usize, usize); 4] = [
        (INDEX_FINGER_TIP,  INDEX_FINGER_MCP),
        (MIDDLE_FINGER_TIP, MIDDLE_FINGER_MCP),
        (RING_FINGER_TIP,   RING_FINGER_MCP),
        (PINKY_TIP,         PINKY_MCP),
    ];
}

pub const LANDMARK_COUNT: usize = 21;

// ════════════════════════════════════════════════════════════════════════════
// Landmark
// ════════════════════════════════════════════════════════════════════════════

/// A single hand landmark in normalised image space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    /// 0.0 to 1.0, normalised to image width
    pub x: f32,
    /// 0.0 to 1.0, normalised to image height
    pub y: f32,
    /// depth, relative to the wrist
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Landmark { x, y, z }
    }

    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Gesture / GestureResult
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Gesture {
    #[default]
    None,
    OpenPalm,
    ClosedFist,
    Pinch,
}

impl Gesture {
    pub fn name(&self) -> &'static str {
        match self {
            Gesture::None       => "none",
            Gesture::OpenPalm   => "open palm",
            Gesture::ClosedFist => "closed fist",
            Gesture::Pinch      => "pinch",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureResult {
    pub label: Gesture,
    /// In `[-1, 1]`.
    pub tilt:  f32,
}

impl GestureResult {
    pub const NONE: GestureResult = GestureResult { label: Gesture::None, tilt: 0.0 };
}

impl Default for GestureResult {
    fn default() -> Self { GestureResult::NONE }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureClassifier
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassifierConfig {
    /// Thumb-tip to index-tip distance below which the hand is pinching.
    pub pinch_threshold: f32,
    /// Folded fingers (of four) needed for a fist.
    pub fold_quorum:     usize,
    pub tilt_gain:       f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            pinch_threshold: 0.05,
            fold_quorum:     3,
            tilt_gain:       5.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GestureClassifier {
    pub config: ClassifierConfig,
}

impl GestureClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        GestureClassifier { config }
    }

    /// Classify zero or one hand.  Never panics.
    pub fn classify(&self, hand: Option<&[Landmark]>) -> GestureResult {
        let lm = match hand {
            Some(lm) if lm.len() >= LANDMARK_COUNT
                && lm[..LANDMARK_COUNT].iter().all(Landmark::is_finite) => lm,
            _ => return GestureResult::NONE,
        };

        GestureResult { label: self.label(lm), tilt: self.tilt(lm) }
    }

    fn label(&self, lm: &[Landmark]) -> Gesture {
        use landmarks::*;

        if lm[THUMB_TIP].distance(&lm[INDEX_FINGER_TIP]) < self.config.pinch_threshold {
            return Gesture::Pinch;
        }

        let wrist  = &lm[WRIST];
        let folded = FINGERS
            .iter()
            .filter(|&&(tip, mcp)| lm[tip].distance(wrist) < lm[mcp].distance(wrist))
            .count();

        if folded >= self.config.fold_quorum {
            Gesture::ClosedFist
        } else {
            Gesture::OpenPalm
        }
    }

    fn tilt(&self, lm: &[Landmark]) -> f32 {
        let dy = lm[landmarks::PINKY_MCP].y - lm[landmarks::THUMB_CMC].y;
        (dy * self.config.tilt_gain).clamp(-1.0, 1.0)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// synth: synthetic hands for the keyboard simulator and tests
// ════════════════════════════════════════════════════════════════════════════

/// Builds plausible 21-landmark hands for a handful of poses.
pub mod synth {
    use super::{landmarks::*, Landmark, LANDMARK_COUNT};

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Pose {
        OpenPalm,
        Fist,
        Pinch,
    }

    const WRIST_AT:     Landmark = Landmark::new(0.50, 0.80, 0.0);
    const THUMB_CMC_AT: Landmark = Landmark::new(0.42, 0.70, 0.0);

    /// Knuckle positions of index, middle, ring (pinky is tilt-driven).
    const KNUCKLES: [Landmark; 3] = [
        Landmark::new(0.44, 0.60, 0.0),
        Landmark::new(0.49, 0.60, 0.0),
        Landmark::new(0.54, 0.60, 0.0),
    ];
    const OPEN_TIPS: [Landmark; 4] = [
        Landmark::new(0.44, 0.36, 0.0),
        Landmark::new(0.49, 0.33, 0.0),
        Landmark::new(0.54, 0.36, 0.0),
        Landmark::new(0.59, 0.42, 0.0),
    ];
    const FIST_TIPS: [Landmark; 4] = [
        Landmark::new(0.45, 0.70, 0.0),
        Landmark::new(0.50, 0.71, 0.0),
        Landmark::new(0.54, 0.71, 0.0),
        Landmark::new(0.57, 0.74, 0.0),
    ];

    /// A hand in `pose` whose classified tilt is `tilt` (default gain 5).
    pub fn hand(pose: Pose, tilt: f32) -> Vec<Landmark> {
        let mut lm = vec![Landmark::default(); LANDMARK_COUNT];

        lm[WRIST]     = WRIST_AT;
        lm[THUMB_CMC] = THUMB_CMC_AT;
        lm[THUMB_MCP] = Landmark::new(0.38, 0.64, 0.0);
        lm[THUMB_IP]  = Landmark::new(0.34, 0.58, 0.0);

        let pinky_mcp = Landmark::new(0.58, THUMB_CMC_AT.y + tilt.clamp(-1.0, 1.0) / 5.0, 0.0);
        let knuckles  = [KNUCKLES[0], KNUCKLES[1], KNUCKLES[2], pinky_mcp];
        let tips      = if pose == Pose::Fist { FIST_TIPS } else { OPEN_TIPS };

        for (f, &(tip, mcp)) in FINGERS.iter().enumerate() {
            lm[mcp]     = knuckles[f];
            lm[mcp + 1] = mix(knuckles[f], tips[f], 0.4);
            lm[mcp + 2] = mix(knuckles[f], tips[f], 0.7);
            lm[tip]     = tips[f];
        }

        lm[THUMB_TIP] = match pose {
            Pose::Pinch => {
                let t = lm[INDEX_FINGER_TIP];
                Landmark::new(t.x - 0.01, t.y + 0.01, t.z)
            }
            _ => Landmark::new(0.30, 0.52, 0.0),
        };
        lm
    }

    fn mix(a: Landmark, b: Landmark, t: f32) -> Landmark {
        Landmark::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t, a.z + (b.z - a.z) * t)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::synth::{hand, Pose};
    use super::*;

    fn classify(lm: &[Landmark]) -> GestureResult {
        GestureClassifier::default().classify(Some(lm))
    }

    #[test]
    fn landmark_indices_cover_the_hand() {
        use landmarks::*;
        assert_eq!(PINKY_TIP + 1, LANDMARK_COUNT);
        let knuckles: Vec<usize> = FINGERS.iter().map(|&(_, mcp)| mcp).collect();
        assert_eq!(knuckles, [5, 9, 13, 17]);
        assert!(FINGERS.iter().all(|&(tip, mcp)| tip == mcp + 3));
        assert_eq!(THUMB_TIP, THUMB_CMC + 3);
    }

    #[test]
    fn absent_hand_is_none() {
        assert_eq!(GestureClassifier::default().classify(None), GestureResult::NONE);
    }

    #[test]
    fn empty_landmarks_is_none() {
        assert_eq!(classify(&[]), GestureResult::NONE);
    }

    #[test]
    fn short_landmark_list_is_none() {
        let lm = hand(Pose::Fist, 0.5);
        assert_eq!(classify(&lm[..20]), GestureResult::NONE);
    }

    #[test]
    fn non_finite_landmark_is_none() {
        let mut lm = hand(Pose::OpenPalm, 0.0);
        lm[landmarks::RING_FINGER_DIP].y = f32::NAN;
        assert_eq!(classify(&lm), GestureResult::NONE);
    }

    #[test]
    fn open_hand_is_open_palm() {
        let lm = hand(Pose::OpenPalm, 0.0);
        assert!(lm[landmarks::THUMB_TIP].distance(&lm[landmarks::INDEX_FINGER_TIP]) >= 0.05);
        assert_eq!(classify(&lm).label, Gesture::OpenPalm);
    }

    #[test]
    fn folded_hand_is_fist() {
        assert_eq!(classify(&hand(Pose::Fist, 0.0)).label, Gesture::ClosedFist);
    }

    #[test]
    fn pinch_detected() {
        assert_eq!(classify(&hand(Pose::Pinch, 0.0)).label, Gesture::Pinch);
    }

    #[test]
    fn pinch_wins_over_fist() {
        let mut lm = hand(Pose::Fist, 0.0);
        let t = lm[landmarks::INDEX_FINGER_TIP];
        lm[landmarks::THUMB_TIP] = Landmark::new(t.x + 0.01, t.y, t.z);
        assert_eq!(classify(&lm).label, Gesture::Pinch);
    }

    #[test]
    fn two_folded_fingers_is_still_open() {
        let mut lm = hand(Pose::OpenPalm, 0.0);
        let fist = hand(Pose::Fist, 0.0);
        for &(tip, _) in &landmarks::FINGERS[..2] {
            lm[tip] = fist[tip];
        }
        assert_eq!(classify(&lm).label, Gesture::OpenPalm);
    }

    #[test]
    fn tilt_follows_pinky_knuckle() {
        for &t in &[-0.8_f32, -0.3, 0.0, 0.5] {
            let r = classify(&hand(Pose::OpenPalm, t));
            assert!((r.tilt - t).abs() < 1e-4, "wanted {} got {}", t, r.tilt);
        }
    }

    #[test]
    fn tilt_is_clamped() {
        let mut lm = hand(Pose::OpenPalm, 0.0);
        lm[landmarks::PINKY_MCP].y = lm[landmarks::THUMB_CMC].y + 0.9;
        assert_eq!(classify(&lm).tilt, 1.0);
        lm[landmarks::PINKY_MCP].y = lm[landmarks::THUMB_CMC].y - 0.9;
        assert_eq!(classify(&lm).tilt, -1.0);
    }

    #[test]
    fn tilt_reported_with_any_label() {
        let r = classify(&hand(Pose::Fist, -0.4));
        assert_eq!(r.label, Gesture::ClosedFist);
        assert!((r.tilt + 0.4).abs() < 1e-4);
    }
}
