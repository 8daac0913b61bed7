//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  mode / gesture / photos                                 │
//! │                                                          │
//! │                       *  .                               │
//! │                    .  ▣ *  .     particles, far first    │
//! │                  *  . * . ▣ *    ▣ = framed photo tile   │
//! │                .  * ▣ . * .  *                          │
//! │                                                          │
//! │  status bar                                              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every particle is a screen-aligned square, sized by scale over depth and
//! drawn in painter's order.

use std::sync::mpsc::Sender;
use std::time::Duration;

use glam::{Mat4, Vec3};
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use ornament_core::gesture::synth::Pose;
use ornament_core::{CameraView, Choreographer, ViewProvider};

use crate::detect::SimInput;
use crate::error::AppResult;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:      usize = 960;
pub const WIN_H:      usize = 720;
const STATUS_H:       usize = 40;
const STATUS_Y:       usize = WIN_H - STATUS_H;
const BG_COLOR:       u32   = 0xFF0B1026;
const TEXT_BG:        u32   = 0xFF141C3A;
const FRAME_COLOR:    u32   = 0xFFE8DCC0;
const FOCUS_COLOR:    u32   = 0xFFFFD700;  // gold
/// World-space edge length of a particle with scale 1.
const PARTICLE_SIZE:  f32   = 0.6;
const TILT_STEP:      f32   = 0.05;

// ════════════════════════════════════════════════════════════════════════════
// SceneCamera: fixed perspective camera, also the view provider
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneCamera {
    pub position: Vec3,
    pub target:   Vec3,
    /// Vertical field of view, radians.
    pub fov_y:    f32,
    pub near:     f32,
    pub far:      f32,
}

/// A world point on screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projected {
    pub x:     f32,
    pub y:     f32,
    /// Distance along the view axis; larger is farther.
    pub depth: f32,
    /// Pixels per world unit at this depth.
    pub ppu:   f32,
}

impl SceneCamera {
    pub fn new(distance: f32, height: f32) -> Self {
        SceneCamera {
            position: Vec3::new(0.0, height, distance),
            target:   Vec3::ZERO,
            fov_y:    50f32.to_radians(),
            near:     0.1,
            far:      200.0,
        }
    }

    fn aspect(&self) -> f32 { WIN_W as f32 / STATUS_Y as f32 }

    pub fn view_proj(&self) -> Mat4 {
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect(), self.near, self.far);
        let view = Mat4::look_at_rh(self.position, self.target, Vec3::Y);
        proj * view
    }

    /// Project into the scene area (everything above the status bar).
    /// `None` when the point is behind the near plane.
    pub fn project(&self, world: Vec3) -> Option<Projected> {
        let clip = self.view_proj() * world.extend(1.0);
        if clip.w < self.near {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let half_h = STATUS_Y as f32 * 0.5;
        let focal = 1.0 / (self.fov_y * 0.5).tan();

        Some(Projected {
            x:     (ndc.x * 0.5 + 0.5) * WIN_W as f32,
            y:     (0.5 - ndc.y * 0.5) * STATUS_Y as f32,
            depth: clip.w,
            ppu:   focal * half_h / clip.w,
        })
    }
}

impl ViewProvider for SceneCamera {
    fn camera_view(&self) -> CameraView {
        CameraView { position: self.position, forward: self.target - self.position }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Commands the window hands back to the app
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiCommand {
    AddPhoto,
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

struct Sprite {
    x:       isize,
    y:       isize,
    half:    isize,
    depth:   f32,
    color:   u32,
    photo:   bool,
    focused: bool,
}

pub struct Visualizer {
    window: Window,
    canvas: Canvas,
    sim_tx: Option<Sender<SimInput>>,
    camera: SceneCamera,
}

impl Visualizer {
    /// `sim_tx` is `None` when a real landmark provider owns the hand.
    pub fn new(camera: SceneCamera, sim_tx: Option<Sender<SimInput>>) -> AppResult<Self> {
        let mut window = Window::new(
            "Gesture Tree",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            canvas: Canvas::new(WIN_W, WIN_H),
            sim_tx,
            camera,
        })
    }

    pub fn camera(&self) -> &SceneCamera { &self.camera }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Translate keys into simulated-hand events and app commands.
    pub fn poll_input(&mut self) -> Vec<UiCommand> {
        let mut commands = Vec::new();
        if !self.window.is_open() {
            commands.push(UiCommand::Quit);
            return commands;
        }

        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        let held     = |k: Key| self.window.is_key_pressed(k, KeyRepeat::Yes);

        if one_shot(Key::Q) || one_shot(Key::Escape) {
            commands.push(UiCommand::Quit);
        }
        if one_shot(Key::A) {
            commands.push(UiCommand::AddPhoto);
        }

        let mut sim = Vec::new();
        if one_shot(Key::F) { sim.push(SimInput::Hand(Some(Pose::Fist))); }
        if one_shot(Key::O) { sim.push(SimInput::Hand(Some(Pose::OpenPalm))); }
        if one_shot(Key::P) { sim.push(SimInput::Hand(Some(Pose::Pinch))); }
        if one_shot(Key::N) { sim.push(SimInput::Hand(None)); }
        if held(Key::Left)  { sim.push(SimInput::TiltBy(-TILT_STEP)); }
        if held(Key::Right) { sim.push(SimInput::TiltBy(TILT_STEP)); }

        if let Some(tx) = &self.sim_tx {
            for input in sim {
                // receiver gone means the detection loop stopped; nothing to do
                let _ = tx.send(input);
            }
        }

        commands
    }

    /// Render one frame.
    pub fn render(&mut self, choreo: &Choreographer, status: &str) {
        self.canvas.clear(BG_COLOR);

        // ── Particles, far to near ────────────────────────────────────────
        for s in self.sprites(choreo) {
            draw_sprite(&mut self.canvas, &s);
        }

        // ── Header ────────────────────────────────────────────────────────
        let header = format!(
            "mode: {}  photos: {}  tilt: {:+.2}",
            choreo.mode().name(),
            choreo.photos().len(),
            choreo.smoothed_tilt(),
        );
        self.canvas.text(&header, 10, 10, 0xFFAADDFF);

        // ── Status bar ────────────────────────────────────────────────────
        self.canvas.fill(0, STATUS_Y as isize, WIN_W as isize, STATUS_H as isize, TEXT_BG);
        self.canvas.text(status, 10, STATUS_Y as isize + 8, 0xFFEEEEEE);

        if self.sim_tx.is_some() {
            self.canvas.text(
                "F=fist  O=open  P=pinch  N=no hand  Left/Right=tilt  A=add photo  Q=quit",
                10, WIN_H as isize - 14, 0xFF888888,
            );
        }

        if let Err(e) = self.window.update_with_buffer(self.canvas.pixels(), WIN_W, WIN_H) {
            log::warn!("frame not presented: {}", e);
        }
    }

    fn sprites(&self, choreo: &Choreographer) -> Vec<Sprite> {
        let group = choreo.group();
        let focus = choreo.focus_target();

        let mut sprites: Vec<Sprite> = choreo.particles()
            .iter()
            .zip(choreo.render_states())
            .enumerate()
            .filter_map(|(i, (p, s))| {
                let pr = self.camera.project(group.to_world(s.position))?;
                let half = (s.scale.x * PARTICLE_SIZE * pr.ppu * 0.5).round().max(1.0) as isize;
                // spin shows up as a gentle shimmer
                let shade = 0.35 * (1.0 - s.rotation.y.cos()) * 0.5;
                Some(Sprite {
                    x:       pr.x.round() as isize,
                    y:       pr.y.round() as isize,
                    half,
                    depth:   pr.depth,
                    color:   if p.is_photo() { p.color } else { blend(p.color, 0xFF000000, shade) },
                    photo:   p.is_photo(),
                    focused: focus == Some(i),
                })
            })
            .collect();

        sprites.sort_by(|a, b| b.depth.total_cmp(&a.depth));
        sprites
    }
}

fn draw_sprite(canvas: &mut Canvas, s: &Sprite) {
    let (x, y, side) = (s.x - s.half, s.y - s.half, 2 * s.half);

    if s.photo {
        // frame, then a muted picture area inset by a tenth of the tile
        canvas.fill(x, y, side, side, FRAME_COLOR);
        let inset = (s.half / 5).max(1);
        canvas.fill(x + inset, y + inset, side - 2 * inset, side - 2 * inset,
                    blend(s.color, 0xFF3A4A6A, 0.6));
    } else {
        canvas.fill(x, y, side, side, s.color);
    }

    if s.focused {
        canvas.outline(x, y, side, side, FOCUS_COLOR);
        canvas.outline(x - 1, y - 1, side + 2, side + 2, FOCUS_COLOR);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Canvas: ARGB framebuffer with clipped primitives
// ════════════════════════════════════════════════════════════════════════════

/// Every primitive takes signed coordinates and clips to the buffer, so
/// callers can draw shapes that hang off any edge.
pub struct Canvas {
    buf:    Vec<u32>,
    width:  usize,
    height: usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Canvas { buf: vec![0; width * height], width, height }
    }

    pub fn pixels(&self) -> &[u32] { &self.buf }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.buf[y * self.width + x])
    }

    pub fn clear(&mut self, color: u32) { self.buf.fill(color); }

    pub fn fill(&mut self, x: isize, y: isize, w: isize, h: isize, color: u32) {
        let x0 = x.clamp(0, self.width as isize) as usize;
        let y0 = y.clamp(0, self.height as isize) as usize;
        let x1 = (x + w).clamp(0, self.width as isize) as usize;
        let y1 = (y + h).clamp(0, self.height as isize) as usize;
        if x0 >= x1 {
            return;
        }
        for row in y0..y1 {
            self.buf[row * self.width + x0..row * self.width + x1].fill(color);
        }
    }

    pub fn outline(&mut self, x: isize, y: isize, w: isize, h: isize, color: u32) {
        if w <= 0 || h <= 0 { return; }
        self.fill(x, y, w, 1, color);
        self.fill(x, y + h - 1, w, 1, color);
        self.fill(x, y, 1, h, color);
        self.fill(x + w - 1, y, 1, h, color);
    }

    /// 3×5 glyphs on a 4-pixel advance; stops at the right edge.
    pub fn text(&mut self, text: &str, x: isize, y: isize, color: u32) {
        for (i, ch) in text.chars().enumerate() {
            let cx = x + 4 * i as isize;
            if cx + 3 > self.width as isize { break; }
            let bits = glyph(ch);
            for row in 0..5 {
                for col in 0..3 {
                    if bits & (1 << (14 - 3 * row - col)) != 0 {
                        self.fill(cx + col as isize, y + row as isize, 1, 1, color);
                    }
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// 3×5 bitmap font: five 3-bit rows per glyph, top row in the high bits
// ────────────────────────────────────────────────────────────────────────────

const GLYPHS: [(char, u16); 46] = [
    ('(', 0o24442), (')', 0o21112), ('+', 0o02720), (',', 0o00024),
    ('-', 0o00700), ('.', 0o00002), ('/', 0o11244), ('0', 0o75557),
    ('1', 0o26227), ('2', 0o71747), ('3', 0o71717), ('4', 0o55711),
    ('5', 0o74717), ('6', 0o74757), ('7', 0o71111), ('8', 0o75757),
    ('9', 0o75717), (':', 0o02020), ('=', 0o07070), ('>', 0o42124),
    ('A', 0o75755), ('B', 0o65656), ('C', 0o74447), ('D', 0o65556),
    ('E', 0o74747), ('F', 0o74744), ('G', 0o74557), ('H', 0o55755),
    ('I', 0o72227), ('J', 0o11157), ('K', 0o55655), ('L', 0o44447),
    ('M', 0o57555), ('N', 0o75555), ('O', 0o75557), ('P', 0o75744),
    ('Q', 0o75571), ('R', 0o65655), ('S', 0o74717), ('T', 0o72222),
    ('U', 0o55557), ('V', 0o55522), ('W', 0o55575), ('X', 0o55255),
    ('Y', 0o55722), ('Z', 0o71247),
];

/// Case-insensitive; unknown characters render as a centred dot.
fn glyph(c: char) -> u16 {
    if c == ' ' {
        return 0;
    }
    let c = c.to_ascii_uppercase();
    GLYPHS
        .binary_search_by_key(&c, |&(k, _)| k)
        .map_or(0o00200, |i| GLYPHS[i].1)
}

/// Blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let mix = |shift: u32| {
        let (ca, cb) = ((a >> shift) & 0xFF, (b >> shift) & 0xFF);
        ((ca as f32 * (1.0 - t) + cb as f32 * t) as u32) << shift
    };
    0xFF000000 | mix(16) | mix(8) | mix(0)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
