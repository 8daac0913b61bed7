//! Particle layout generation.
//!
//! Every particle gets two fixed targets: an *aggregated* position on the
//! tree cone and a *scattered* position somewhere in a box around it.
//! Photo slots come first in the output, decorations after, so index-based
//! correspondence between generations is reproducible.
//!
//! Two independent random streams are used.  The layout stream drives
//! everything about a decoration except its scatter target, and is consumed
//! strictly in decoration order, so decoration `i` on the cone is a pure
//! function of `(layout seed, i, N)` no matter how many photos there are.

use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ════════════════════════════════════════════════════════════════════════════
// Constants
// ════════════════════════════════════════════════════════════════════════════

/// π(3 − √5), the phyllotaxis step between consecutive points.
pub const GOLDEN_ANGLE: f32 = 2.399_963_2;

/// Photo slots step `PHOTO_ANGLE_FACTOR` golden angles per index so they
/// fall between the decoration spiral arms.
pub const PHOTO_ANGLE_FACTOR: f32 = 3.0;

/// Normalised height band `[lo, hi]` holding the photo spiral.
pub const PHOTO_BAND: (f32, f32) = (0.25, 0.70);

/// Radial push of photo slots outside the cone skin.
pub const PHOTO_SURFACE_OFFSET: f32 = 0.4;

pub const PHOTO_SCALE: f32 = 0.9;
pub const PHOTO_COLOR: u32 = 0xFFF8F4E8;

/// Probability that a decoration is a bauble rather than a gift box.
pub const BAUBLE_PROBABILITY: f32 = 0.6;

/// Radial samples are `sqrt(u)` with `u` in `[SURFACE_BIAS, 1)`.
pub const SURFACE_BIAS: f32 = 0.7;

/// Cumulative thresholds of the decoration palette buckets.
pub const PALETTE_THRESHOLDS: [f32; 5] = [0.30, 0.55, 0.75, 0.90, 1.00];

/// ARGB palette, one entry per threshold bucket.
pub const PALETTE: [u32; 5] = [
    0xFFD4AF37, // gold
    0xFFC0392B, // crimson
    0xFF1E8449, // pine
    0xFFECF0F1, // frost
    0xFF2E86C1, // ice blue
];

const DECORATION_SCALE: (f32, f32) = (0.18, 0.32);

// ════════════════════════════════════════════════════════════════════════════
// TreeShape
// ════════════════════════════════════════════════════════════════════════════

/// The cone the aggregated layout sits on and the box the scatter targets
/// are drawn from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeShape {
    pub height:      f32,
    pub base_radius: f32,
    /// World y of the cone base.
    pub base_y:      f32,
    /// Half extents of the scatter box, centred on the cone's mid-height.
    pub scatter_half_extent: Vec3,
}

impl Default for TreeShape {
    fn default() -> Self {
        TreeShape {
            height:      12.0,
            base_radius: 5.0,
            base_y:      -6.0,
            scatter_half_extent: Vec3::new(12.5, 9.0, 12.5),
        }
    }
}

impl TreeShape {
    /// Cone radius at normalised height `h` (0 = base, 1 = apex).
    pub fn radius_at(&self, h: f32) -> f32 {
        self.base_radius * (1.0 - h.clamp(0.0, 1.0))
    }

    /// World y at normalised height `h`.
    pub fn y_at(&self, h: f32) -> f32 {
        self.base_y + h * self.height
    }

    pub fn center(&self) -> Vec3 {
        Vec3::new(0.0, self.base_y + self.height * 0.5, 0.0)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Particle records
// ════════════════════════════════════════════════════════════════════════════

/// Opaque handle to a user photo.  Identity is the handle string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PhotoRef(Arc<str>);

impl PhotoRef {
    pub fn new(handle: impl AsRef<str>) -> Self {
        PhotoRef(Arc::from(handle.as_ref()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Debug for PhotoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhotoRef({:?})", &*self.0)
    }
}

impl fmt::Display for PhotoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoration sub-kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ornament {
    Bauble,
    Gift,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParticleKind {
    Decoration(Ornament),
    PhotoSlot,
}

/// Stable identity of a particle across regenerations.
///
/// Photos are append-only, so photo `j` keeps its id; decoration `i` keeps
/// its id as long as the decoration count is unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParticleId {
    Photo(usize),
    Decoration(usize),
}

/// One generated particle.  Immutable once generated.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub id:         ParticleId,
    pub kind:       ParticleKind,
    pub aggregated: Vec3,
    pub scattered:  Vec3,
    /// Euler angles, radians, in `animate::EULER_ORDER`.
    pub rotation:   Vec3,
    pub scale:      f32,
    pub color:      u32,
    pub photo:      Option<PhotoRef>,
}

impl Particle {
    pub fn is_photo(&self) -> bool {
        matches!(self.kind, ParticleKind::PhotoSlot)
    }
}

/// Seeds of the two random streams.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutSeeds {
    pub layout:  u64,
    pub scatter: u64,
}

// ════════════════════════════════════════════════════════════════════════════
// generate
// ════════════════════════════════════════════════════════════════════════════

/// Build the full particle list: `photos.len()` photo slots followed by
/// `decorations` decorations.
pub fn generate(
    photos:      &[PhotoRef],
    decorations: usize,
    shape:       &TreeShape,
    seeds:       LayoutSeeds,
) -> Vec<Particle> {
    let mut layout_rng  = StdRng::seed_from_u64(seeds.layout);
    let mut scatter_rng = StdRng::seed_from_u64(seeds.scatter);

    // Decorations draw their scatter targets before the photos do, so a
    // stable scatter seed keeps them put when photos are appended.
    let decos: Vec<Particle> = (0..decorations)
        .map(|i| {
            let mut p = decoration(i, decorations, shape, &mut layout_rng);
            p.scattered = scatter_point(shape, &mut scatter_rng);
            p
        })
        .collect();

    let mut out = Vec::with_capacity(photos.len() + decorations);
    for (j, photo) in photos.iter().enumerate() {
        let mut p = photo_slot(j, photos.len(), photo.clone(), shape);
        p.scattered = scatter_point(shape, &mut scatter_rng);
        out.push(p);
    }
    out.extend(decos);

    log::debug!(
        "generated {} particles ({} photo slots, {} decorations)",
        out.len(), photos.len(), decorations
    );
    out
}

/// Bucket index of a uniform draw `r` in `[0, 1)`.
pub fn palette_bucket(r: f32) -> usize {
    PALETTE_THRESHOLDS
        .iter()
        .position(|&t| r < t)
        .unwrap_or(PALETTE_THRESHOLDS.len() - 1)
}

fn decoration(i: usize, n: usize, shape: &TreeShape, rng: &mut StdRng) -> Particle {
    let h      = i as f32 / n.max(1) as f32;
    let angle  = i as f32 * GOLDEN_ANGLE;
    let u      = SURFACE_BIAS + (1.0 - SURFACE_BIAS) * rng.gen::<f32>();
    let radius = shape.radius_at(h) * u.sqrt();

    let aggregated = Vec3::new(radius * angle.cos(), shape.y_at(h), radius * angle.sin());

    let ornament = if rng.gen::<f32>() < BAUBLE_PROBABILITY {
        Ornament::Bauble
    } else {
        Ornament::Gift
    };
    let color = PALETTE[palette_bucket(rng.gen::<f32>())];
    let rotation = Vec3::new(
        rng.gen_range(0.0..std::f32::consts::TAU),
        rng.gen_range(0.0..std::f32::consts::TAU),
        rng.gen_range(0.0..std::f32::consts::TAU),
    );
    let scale = rng.gen_range(DECORATION_SCALE.0..DECORATION_SCALE.1);

    Particle {
        id:        ParticleId::Decoration(i),
        kind:      ParticleKind::Decoration(ornament),
        aggregated,
        scattered: aggregated,
        rotation,
        scale,
        color,
        photo:     None,
    }
}

fn photo_slot(j: usize, count: usize, photo: PhotoRef, shape: &TreeShape) -> Particle {
    let (lo, hi) = PHOTO_BAND;
    let t      = (j as f32 + 0.5) / count.max(1) as f32;
    let h      = lo + (hi - lo) * t;
    let angle  = j as f32 * GOLDEN_ANGLE * PHOTO_ANGLE_FACTOR;
    let radius = shape.radius_at(h) + PHOTO_SURFACE_OFFSET;

    let (x, z) = (radius * angle.cos(), radius * angle.sin());
    // Face outward: local +Z along the radial direction.
    let yaw = x.atan2(z);

    Particle {
        id:         ParticleId::Photo(j),
        kind:       ParticleKind::PhotoSlot,
        aggregated: Vec3::new(x, shape.y_at(h), z),
        scattered:  Vec3::ZERO,
        rotation:   Vec3::new(0.0, yaw, 0.0),
        scale:      PHOTO_SCALE,
        color:      PHOTO_COLOR,
        photo:      Some(photo),
    }
}

fn scatter_point(shape: &TreeShape, rng: &mut StdRng) -> Vec3 {
    let e = shape.scatter_half_extent;
    shape.center()
        + Vec3::new(
            rng.gen_range(-e.x..=e.x),
            rng.gen_range(-e.y..=e.y),
            rng.gen_range(-e.z..=e.z),
        )
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const SEEDS: LayoutSeeds = LayoutSeeds { layout: 7, scatter: 11 };

    fn photos(n: usize) -> Vec<PhotoRef> {
        (0..n).map(|i| PhotoRef::new(format!("photo-{i}.jpg"))).collect()
    }

    #[test]
    fn golden_angle_matches_formula() {
        let exact = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
        assert!((GOLDEN_ANGLE - exact).abs() < 1e-5);
    }

    #[test]
    fn counts_and_order() {
        let shape = TreeShape::default();
        for &(n, p) in &[(0, 0), (0, 3), (5, 0), (40, 7)] {
            let ps = generate(&photos(p), n, &shape, SEEDS);
            assert_eq!(ps.len(), n + p);
            assert_eq!(ps.iter().filter(|x| x.is_photo()).count(), p);
            // photo slots first
            assert!(ps[..p].iter().all(Particle::is_photo));
            assert!(ps[p..].iter().all(|x| !x.is_photo()));
        }
    }

    #[test]
    fn photo_slots_stay_in_mid_band() {
        let shape = TreeShape::default();
        let lo = shape.y_at(PHOTO_BAND.0);
        let hi = shape.y_at(PHOTO_BAND.1);
        for p in generate(&photos(23), 10, &shape, SEEDS).iter().filter(|p| p.is_photo()) {
            assert!(p.aggregated.y >= lo && p.aggregated.y <= hi, "y={}", p.aggregated.y);
        }
    }

    #[test]
    fn decorations_stay_inside_cone() {
        let shape = TreeShape::default();
        for p in generate(&[], 300, &shape, SEEDS) {
            let h = (p.aggregated.y - shape.base_y) / shape.height;
            let r = Vec3::new(p.aggregated.x, 0.0, p.aggregated.z).length();
            assert!(r <= shape.radius_at(h) + 1e-4);
            // surface bias keeps everything at least sqrt(0.7) of the way out
            assert!(r >= shape.radius_at(h) * SURFACE_BIAS.sqrt() - 1e-4);
        }
    }

    #[test]
    fn decoration_layout_independent_of_photos_and_scatter() {
        let shape = TreeShape::default();
        let a = generate(&photos(0), 50, &shape, SEEDS);
        let b = generate(&photos(4), 50, &shape, LayoutSeeds { layout: 7, scatter: 999 });
        for (da, db) in a.iter().zip(b[4..].iter()) {
            assert_eq!(da.id, db.id);
            assert_eq!(da.aggregated, db.aggregated);
            assert_eq!(da.color, db.color);
            assert_eq!(da.kind, db.kind);
        }
        assert_ne!(a[0].scattered, b[4].scattered);
    }

    #[test]
    fn stable_scatter_seed_keeps_decoration_targets() {
        let shape = TreeShape::default();
        let a = generate(&photos(1), 30, &shape, SEEDS);
        let b = generate(&photos(2), 30, &shape, SEEDS);
        for (da, db) in a[1..].iter().zip(b[2..].iter()) {
            assert_eq!(da.scattered, db.scattered);
        }
    }

    #[test]
    fn scatter_inside_box() {
        let shape = TreeShape::default();
        let c = shape.center();
        let e = shape.scatter_half_extent;
        for p in generate(&photos(5), 200, &shape, SEEDS) {
            let d = (p.scattered - c).abs();
            assert!(d.x <= e.x && d.y <= e.y && d.z <= e.z);
        }
    }

    #[test]
    fn palette_thresholds() {
        assert_eq!(palette_bucket(0.0), 0);
        assert_eq!(palette_bucket(0.2999), 0);
        assert_eq!(palette_bucket(0.30), 1);
        assert_eq!(palette_bucket(0.55), 2);
        assert_eq!(palette_bucket(0.80), 3);
        assert_eq!(palette_bucket(0.95), 4);
        assert_eq!(palette_bucket(1.0), 4);
    }

    #[test]
    fn bauble_share_is_roughly_sixty_percent() {
        let ps = generate(&[], 2000, &TreeShape::default(), SEEDS);
        let baubles = ps.iter()
            .filter(|p| p.kind == ParticleKind::Decoration(Ornament::Bauble))
            .count() as f32 / ps.len() as f32;
        assert!((baubles - BAUBLE_PROBABILITY).abs() < 0.05, "share {}", baubles);
    }

    #[test]
    fn zero_decorations_zero_photos() {
        assert!(generate(&[], 0, &TreeShape::default(), SEEDS).is_empty());
    }
}
