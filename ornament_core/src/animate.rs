//! Per-frame animation driver.
//!
//! Each frame every particle's render state is pulled toward a target
//! picked by the current [`DisplayMode`] with exponential smoothing
//! (`current += (target − current) × delta × rate`).  Nothing ever snaps;
//! states only converge.
//!
//! The particle group itself yaws slowly (faster with hand tilt) except in
//! `Focused` mode.  The focused photo is locked in front of the camera by
//! expressing a world-space point in group-local space through the inverse
//! of the group's world matrix, and is turned to face the camera.

use std::collections::HashMap;

use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};

use crate::geometry::{Particle, ParticleId};
use crate::mode::DisplayMode;

/// Rotation order of every Euler triple in the crate: yaw, then pitch,
/// then roll.  Keeps camera-facing rotations away from gimbal lock.
pub const EULER_ORDER: EulerRot = EulerRot::YXZ;

/// Quaternion of an Euler triple stored as `(x, y, z)` angles.
pub fn euler_to_quat(r: Vec3) -> Quat {
    Quat::from_euler(EULER_ORDER, r.y, r.x, r.z)
}

pub fn quat_to_euler(q: Quat) -> Vec3 {
    let (y, x, z) = q.to_euler(EULER_ORDER);
    Vec3::new(x, y, z)
}

// ════════════════════════════════════════════════════════════════════════════
// MotionConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionConfig {
    /// Smoothing rate outside `Focused`, per second.
    pub rate:               f32,
    pub focused_rate:       f32,
    pub float_speed:        f32,
    pub float_amplitude:    f32,
    /// Decoration spin about local x and y, rad/s.
    pub spin:               (f32, f32),
    /// Group yaw with a level hand, rad/s.
    pub idle_yaw_rate:      f32,
    pub tilt_yaw_gain:      f32,
    /// Per-frame weight of the raw tilt in the smoothed tilt.
    pub tilt_smoothing:     f32,
    /// Distance in front of the camera the focused photo settles at.
    pub focus_distance:     f32,
    pub focus_magnification: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        MotionConfig {
            rate:                2.0,
            focused_rate:        4.0,
            float_speed:         0.5,
            float_amplitude:     0.05,
            spin:                (0.2, 0.3),
            idle_yaw_rate:       0.2,
            tilt_yaw_gain:       1.5,
            tilt_smoothing:      0.1,
            focus_distance:      5.0,
            focus_magnification: 4.0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Per-frame inputs
// ════════════════════════════════════════════════════════════════════════════

/// Camera pose in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraView {
    pub position: Vec3,
    /// View direction; need not be normalised.
    pub forward:  Vec3,
}

/// Anything that can report where the camera is this frame.
pub trait ViewProvider {
    fn camera_view(&self) -> CameraView;
}

impl ViewProvider for CameraView {
    fn camera_view(&self) -> CameraView { *self }
}

/// Everything the driver needs from the rest of the system for one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameInput {
    /// Seconds since the previous frame.
    pub delta:    f32,
    pub mode:     DisplayMode,
    pub focus:    Option<usize>,
    pub raw_tilt: f32,
    pub camera:   CameraView,
}

// ════════════════════════════════════════════════════════════════════════════
// RenderState / GroupTransform
// ════════════════════════════════════════════════════════════════════════════

/// Mutable transform of one particle, local to the group.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderState {
    pub position: Vec3,
    pub scale:    Vec3,
    /// Euler angles, radians, applied in [`EULER_ORDER`].
    pub rotation: Vec3,
}

impl RenderState {
    /// Resting on the tree.
    pub fn at_rest(p: &Particle) -> Self {
        RenderState {
            position: p.aggregated,
            scale:    Vec3::splat(p.scale),
            rotation: p.rotation,
        }
    }

    pub fn quat(&self) -> Quat { euler_to_quat(self.rotation) }
}

/// World transform of the whole particle group: a translation and a yaw.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroupTransform {
    pub origin: Vec3,
    pub yaw:    f32,
}

impl GroupTransform {
    pub fn rotation(&self) -> Quat { Quat::from_rotation_y(self.yaw) }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation(), self.origin)
    }

    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.matrix().transform_point3(local)
    }

    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.matrix().inverse().transform_point3(world)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Targets and orientation policy
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub position: Vec3,
    pub scale:    Vec3,
}

/// How a particle's rotation is updated this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrientationPolicy {
    /// Continuous decoration spin, independent of mode.
    Spin,
    /// Ease back to the placement rotation.
    Settle,
    /// Look straight at the camera.
    FaceCamera,
}

pub fn orientation_policy(p: &Particle, focused: bool) -> OrientationPolicy {
    match (p.is_photo(), focused) {
        (false, _)    => OrientationPolicy::Spin,
        (true, false) => OrientationPolicy::Settle,
        (true, true)  => OrientationPolicy::FaceCamera,
    }
}

/// Fraction of the remaining distance covered this frame.
pub fn lerp_factor(delta: f32, rate: f32) -> f32 {
    (delta * rate).clamp(0.0, 1.0)
}

/// World point `focus_distance` in front of the camera, in group space.
pub fn focus_anchor(camera: &CameraView, group: &GroupTransform, cfg: &MotionConfig) -> Vec3 {
    let world = camera.position + camera.forward.normalize_or_zero() * cfg.focus_distance;
    group.to_local(world)
}

/// Scattered target with its per-particle float, keyed on the particle's
/// own scattered x so neighbours drift out of phase.
pub fn scattered_target(p: &Particle, elapsed: f32, cfg: &MotionConfig) -> Vec3 {
    let base = p.scattered;
    let bob  = (elapsed * cfg.float_speed + base.x).sin() * cfg.float_amplitude;
    base + Vec3::new(0.0, bob, 0.0)
}

/// Local rotation (Euler angles) that points the particle's +Z at the camera.
pub fn face_camera(local_position: Vec3, camera: &CameraView, group: &GroupTransform) -> Option<Vec3> {
    let world = group.to_world(local_position);
    let z = (camera.position - world).try_normalize()?;
    let x = Vec3::Y.cross(z).try_normalize().unwrap_or(Vec3::X);
    let y = z.cross(x);

    let world_rot = Quat::from_mat3(&Mat3::from_cols(x, y, z));
    Some(quat_to_euler(group.rotation().inverse() * world_rot))
}

// ════════════════════════════════════════════════════════════════════════════
// AnimationDriver
// ════════════════════════════════════════════════════════════════════════════

/// Owns one [`RenderState`] per particle plus the ambient frame state.
#[derive(Clone, Debug)]
pub struct AnimationDriver {
    config:        MotionConfig,
    states:        Vec<RenderState>,
    group:         GroupTransform,
    smoothed_tilt: f32,
    elapsed:       f32,
}

impl AnimationDriver {
    pub fn new(particles: &[Particle], config: MotionConfig) -> Self {
        AnimationDriver {
            config,
            states:        particles.iter().map(RenderState::at_rest).collect(),
            group:         GroupTransform::default(),
            smoothed_tilt: 0.0,
            elapsed:       0.0,
        }
    }

    pub fn config(&self)        -> &MotionConfig   { &self.config }
    pub fn states(&self)        -> &[RenderState]  { &self.states }
    pub fn group(&self)         -> GroupTransform  { self.group }
    pub fn smoothed_tilt(&self) -> f32             { self.smoothed_tilt }
    pub fn elapsed(&self)       -> f32             { self.elapsed }

    /// Swap in a regenerated particle set.  Particles whose id survives keep
    /// their current state; new ones start at rest on the tree.
    pub fn rebind(&mut self, old: &[Particle], new: &[Particle]) {
        let carried: HashMap<ParticleId, RenderState> = old
            .iter()
            .zip(self.states.iter())
            .map(|(p, s)| (p.id, *s))
            .collect();

        self.states = new
            .iter()
            .map(|p| carried.get(&p.id).copied().unwrap_or_else(|| RenderState::at_rest(p)))
            .collect();
    }

    /// Target of particle `index` for the frame described by `input`.
    pub fn target_for(&self, index: usize, p: &Particle, input: &FrameInput) -> Target {
        let cfg  = &self.config;
        let base = Vec3::splat(p.scale);

        match input.mode {
            DisplayMode::Aggregated => Target { position: p.aggregated, scale: base },
            DisplayMode::Focused if input.focus == Some(index) && p.is_photo() => Target {
                position: focus_anchor(&input.camera, &self.group, cfg),
                scale:    base * cfg.focus_magnification,
            },
            DisplayMode::Scattered | DisplayMode::Focused => Target {
                position: scattered_target(p, self.elapsed, cfg),
                scale:    base,
            },
        }
    }

    /// Advance one rendered frame.
    pub fn step(&mut self, particles: &[Particle], input: &FrameInput) {
        debug_assert_eq!(particles.len(), self.states.len());
        let delta = input.delta.max(0.0);
        let cfg   = self.config;

        self.elapsed += delta;
        self.smoothed_tilt += (input.raw_tilt - self.smoothed_tilt) * cfg.tilt_smoothing;

        let focused = input.mode == DisplayMode::Focused;
        if !focused {
            self.group.yaw += (cfg.idle_yaw_rate + self.smoothed_tilt * cfg.tilt_yaw_gain) * delta;
        }

        let rate = if focused { cfg.focused_rate } else { cfg.rate };
        let f    = lerp_factor(delta, rate);

        for (i, p) in particles.iter().enumerate() {
            let target = self.target_for(i, p, input);
            let is_focus = focused && input.focus == Some(i);

            let state = &mut self.states[i];
            state.position = state.position.lerp(target.position, f);
            state.scale    = state.scale.lerp(target.scale, f);

            match orientation_policy(p, is_focus) {
                OrientationPolicy::Spin => {
                    state.rotation.x += cfg.spin.0 * delta;
                    state.rotation.y += cfg.spin.1 * delta;
                }
                OrientationPolicy::Settle => {
                    // shortest arc; Euler components would wrap the long way near ±π
                    if state.rotation != p.rotation {
                        let q = state.quat().slerp(euler_to_quat(p.rotation), f);
                        state.rotation = quat_to_euler(q);
                    }
                }
                OrientationPolicy::FaceCamera => {
                    if let Some(r) = face_camera(state.position, &input.camera, &self.group) {
                        state.rotation = r;
                    }
                }
            }
        }

        log::trace!(
            "frame dt={:.4} mode={} yaw={:.3} tilt~{:.3}",
            delta, input.mode.name(), self.group.yaw, self.smoothed_tilt
        );
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
