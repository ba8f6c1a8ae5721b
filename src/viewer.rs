use std::time::{Duration, Instant};

use image::RgbImage;
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::export::{draw_crosshair, overview_scale, overview_to_grid, render_color_map};
use crate::render::{render_viewport, DayClock, Marker, RenderContext, RenderParams};
use crate::store::{GridCoord, Layer, WorldStore};
use crate::viewport::Viewport;
use crate::wanderers::{spawn_wanderers, step_all, Wanderer};

const BACKGROUND: u32 = (5 << 16) | (5 << 8) | 15;
const MINIMAP_WIDTH: u32 = 256;
const MINIMAP_MARGIN: usize = 8;
const TICK: Duration = Duration::from_secs(1);
const FAST_PAN: i64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("window error: {0}")]
    Window(#[from] minifb::Error),
}

/// Settings for one viewer session.
#[derive(Clone, Debug)]
pub struct ViewerOptions {
    pub window_width: usize,
    pub window_height: usize,
    pub viewport_size: u32,
    pub wanderers: usize,
    pub params: RenderParams,
    /// Seeds the wanderer RNG.
    pub seed: u64,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 800,
            viewport_size: 64,
            wanderers: 8,
            params: RenderParams::default(),
            seed: 0,
        }
    }
}

/// One user intent, decoupled from the window backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Action {
    Pan { dx: i64, dy: i64 },
    HeightMultiplier(f64),
    CloudOffset(f64),
    CloudTransparency(f64),
    TimeSpeed(f64),
    Recenter(GridCoord),
}

/// Map a pressed key to an action. `fast` is true while Shift is held.
pub fn key_action(key: Key, fast: bool) -> Option<Action> {
    let step = if fast { FAST_PAN } else { 1 };
    let action = match key {
        Key::Left => Action::Pan { dx: -step, dy: 0 },
        Key::Right => Action::Pan { dx: step, dy: 0 },
        Key::Up => Action::Pan { dx: 0, dy: -step },
        Key::Down => Action::Pan { dx: 0, dy: step },
        Key::Q => Action::HeightMultiplier(1.0),
        Key::A => Action::HeightMultiplier(-1.0),
        Key::W => Action::CloudOffset(1.0),
        Key::S => Action::CloudOffset(-1.0),
        Key::E => Action::CloudTransparency(0.05),
        Key::D => Action::CloudTransparency(-0.05),
        Key::T => Action::TimeSpeed(0.5),
        Key::G => Action::TimeSpeed(-0.5),
        _ => return None,
    };
    Some(action)
}

const ACTION_KEYS: [Key; 12] = [
    Key::Left,
    Key::Right,
    Key::Up,
    Key::Down,
    Key::Q,
    Key::A,
    Key::W,
    Key::S,
    Key::E,
    Key::D,
    Key::T,
    Key::G,
];

/// Everything the viewer mutates between frames.
pub struct ViewerState {
    pub viewport: Viewport,
    pub params: RenderParams,
    pub clock: DayClock,
    pub wanderers: Vec<Wanderer>,
    rng: ChaCha8Rng,
}

impl ViewerState {
    pub fn new(store: &WorldStore, options: &ViewerOptions) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
        let water_level = store.config().water_level;
        let wanderers = spawn_wanderers(options.wanderers, &store.terrain, water_level, &mut rng);
        Self {
            viewport: Viewport::centered(options.viewport_size, store.width(), store.height()),
            params: options.params.clone(),
            clock: DayClock::default(),
            wanderers,
            rng,
        }
    }

    /// Apply an action; returns true when the frame must be redrawn.
    pub fn apply(&mut self, action: Action) -> bool {
        let mut params = self.params.clone();
        match action {
            Action::Pan { dx, dy } => {
                self.viewport.pan(dx, dy);
                return true;
            }
            Action::Recenter(coord) => {
                self.viewport.center_on(coord);
                return true;
            }
            Action::TimeSpeed(d) => {
                self.clock.speed += d;
                info!(speed = self.clock.speed, "time speed");
                return false;
            }
            Action::HeightMultiplier(d) => {
                params.height_multiplier = (params.height_multiplier + d).max(0.0);
            }
            Action::CloudOffset(d) => {
                params.cloud_offset = (params.cloud_offset + d).max(0.0);
            }
            Action::CloudTransparency(d) => {
                params.cloud_transparency = (params.cloud_transparency + d).clamp(0.0, 2.0);
            }
        }
        // Keep the last params whose canvas still fits.
        if let Err(e) = params.validate_for_window(self.viewport.size, self.viewport.size) {
            warn!(error = %e, "parameter change rejected");
            return false;
        }
        self.params = params;
        true
    }

    /// Advance the clock and every wanderer by one step.
    pub fn tick(&mut self, store: &WorldStore) {
        self.clock.advance();
        step_all(&mut self.wanderers, &store.terrain, store.config().water_level, &mut self.rng);
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.wanderers.iter().map(Wanderer::marker).collect()
    }

    pub fn render(&self, store: &WorldStore) -> RgbImage {
        let ctx = RenderContext::new(self.params.clone(), self.clock.lighting());
        render_viewport(store, &self.viewport, &ctx, &self.markers())
    }
}

fn pack(p: &image::Rgb<u8>) -> u32 {
    ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32
}

/// Copy `img` into a `buf_w`-wide buffer with its top-left corner at
/// `(left, top)`, clipping whatever falls outside.
pub fn blit(buffer: &mut [u32], buf_w: usize, buf_h: usize, img: &RgbImage, left: i64, top: i64) {
    for (x, y, p) in img.enumerate_pixels() {
        let bx = left + x as i64;
        let by = top + y as i64;
        if bx < 0 || by < 0 || bx >= buf_w as i64 || by >= buf_h as i64 {
            continue;
        }
        buffer[by as usize * buf_w + bx as usize] = pack(p);
    }
}

/// Blit `img` centred; larger images are cropped around their centre.
pub fn blit_centered(buffer: &mut [u32], buf_w: usize, buf_h: usize, img: &RgbImage) {
    let left = (buf_w as i64 - img.width() as i64) / 2;
    let top = (buf_h as i64 - img.height() as i64) / 2;
    blit(buffer, buf_w, buf_h, img, left, top);
}

/// Screen rectangle of the minimap in the top-right corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MinimapRect {
    pub left: usize,
    pub top: usize,
    pub width: u32,
    pub height: u32,
}

impl MinimapRect {
    pub fn new(window_width: usize, map: (u32, u32)) -> Self {
        Self {
            left: window_width.saturating_sub(map.0 as usize + MINIMAP_MARGIN),
            top: MINIMAP_MARGIN,
            width: map.0,
            height: map.1,
        }
    }

    /// Grid cell under a window position, if it lies on the minimap.
    pub fn hit(&self, mx: f32, my: f32, world: (u32, u32)) -> Option<GridCoord> {
        let (mx, my) = (mx as i64 - self.left as i64, my as i64 - self.top as i64);
        if mx < 0 || my < 0 || mx >= self.width as i64 || my >= self.height as i64 {
            return None;
        }
        Some(overview_to_grid(mx as u32, my as u32, (self.width, self.height), world))
    }
}

/// Open a window over a populated store and run until Escape or close.
pub fn run_viewer(store: &WorldStore, options: ViewerOptions) -> Result<(), ViewerError> {
    let (win_w, win_h) = (options.window_width, options.window_height);
    let mut window = Window::new(
        "Iso Planet - arrows: pan, Q/A W/S E/D T/G: tune, click map: jump, Esc: exit",
        win_w,
        win_h,
        WindowOptions {
            resize: false,
            scale: minifb::Scale::X1,
            ..WindowOptions::default()
        },
    )?;
    window.set_target_fps(60);

    let mut state = ViewerState::new(store, &options);
    info!(wanderers = state.wanderers.len(), "viewer started");

    let terrain = store.table(Layer::Terrain);
    let minimap_scale = overview_scale(terrain, MINIMAP_WIDTH);
    let minimap_base = render_color_map(terrain, minimap_scale);
    let minimap = MinimapRect::new(win_w, minimap_base.dimensions());
    let world = (store.width(), store.height());

    println!("Viewer controls:");
    println!("  Arrows: pan (Shift: x{FAST_PAN})");
    println!("  Q/A: height multiplier");
    println!("  W/S: cloud offset");
    println!("  E/D: cloud transparency");
    println!("  T/G: time speed");
    println!("  Click minimap: recenter");
    println!("  Esc: exit");

    let mut buffer = vec![BACKGROUND; win_w * win_h];
    let mut needs_redraw = true;
    let mut last_tick = Instant::now();
    let mut mouse_was_down = false;

    while window.is_open() && !window.is_key_down(Key::Escape) {
        let fast = window.is_key_down(Key::LeftShift) || window.is_key_down(Key::RightShift);
        for key in ACTION_KEYS {
            if window.is_key_pressed(key, KeyRepeat::Yes) {
                if let Some(action) = key_action(key, fast) {
                    needs_redraw |= state.apply(action);
                }
            }
        }

        let mouse_down = window.get_mouse_down(MouseButton::Left);
        if mouse_down && !mouse_was_down {
            if let Some((mx, my)) = window.get_mouse_pos(MouseMode::Clamp) {
                if let Some(coord) = minimap.hit(mx, my, world) {
                    info!(x = coord.x, y = coord.y, "recenter");
                    needs_redraw |= state.apply(Action::Recenter(coord));
                }
            }
        }
        mouse_was_down = mouse_down;

        if last_tick.elapsed() >= TICK {
            last_tick = Instant::now();
            state.tick(store);
            needs_redraw = true;
        }

        if needs_redraw {
            let start = Instant::now();
            let frame = state.render(store);
            buffer.fill(BACKGROUND);
            blit_centered(&mut buffer, win_w, win_h, &frame);

            let mut overview = minimap_base.clone();
            draw_crosshair(&mut overview, state.viewport.center(), minimap_scale);
            blit(&mut buffer, win_w, win_h, &overview, minimap.left as i64, minimap.top as i64);

            let center = state.viewport.center();
            window.set_title(&format!(
                "Iso Planet - {} - ({}, {}) - speed {:.1}",
                state.clock.label(),
                center.x,
                center.y,
                state.clock.speed
            ));
            debug!(elapsed_ms = start.elapsed().as_millis() as u64, "frame rendered");
            needs_redraw = false;
        }

        window.update_with_buffer(&buffer, win_w, win_h)?;
    }

    info!("viewer closed");
    Ok(())
}
