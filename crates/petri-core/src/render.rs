//! Backend-agnostic drawing of a [`SimulationSnapshot`].
//!
//! Front ends implement [`Surface`] for their canvas; [`draw`] paints the
//! background, the optional nutrient and toxicity overlays, then every living
//! agent with a short heading line.

use crate::agent::Agent;
use crate::field::Field;
use crate::genome::Traits;
use crate::world::SimulationSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Same colour with alpha set from a `[0, 1]` opacity.
    pub fn with_opacity(self, opacity: f64) -> Self {
        Self {
            a: (opacity.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }
}

pub const BACKGROUND: Rgba = Rgba::opaque(16, 18, 24);
pub const NUTRIENT: Rgba = Rgba::opaque(40, 200, 80);
pub const TOXICITY: Rgba = Rgba::opaque(220, 40, 40);
pub const HEADING: Rgba = Rgba::new(255, 255, 255, 160);

/// A 2D canvas in world units.
pub trait Surface {
    fn fill_background(&mut self, color: Rgba);
    fn fill_rect(&mut self, origin: [f64; 2], size: [f64; 2], color: Rgba);
    fn fill_circle(&mut self, center: [f64; 2], radius: f64, color: Rgba);
    fn line(&mut self, from: [f64; 2], to: [f64; 2], color: Rgba);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub show_nutrients: bool,
    pub show_toxicity: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_nutrients: true,
            show_toxicity: true,
        }
    }
}

/// Overlay opacity at full saturation.
const OVERLAY_MAX_OPACITY: f64 = 0.5;
/// Toxicity cells at or below this normalised level are not painted.
const TOXICITY_THRESHOLD: f64 = 0.1;

pub fn draw<S: Surface + ?Sized>(
    surface: &mut S,
    snapshot: &SimulationSnapshot,
    options: &RenderOptions,
) {
    surface.fill_background(BACKGROUND);
    if options.show_nutrients {
        paint_field(surface, &snapshot.environment.nutrients, 2.0, 0.0, NUTRIENT);
    }
    if options.show_toxicity {
        paint_field(
            surface,
            &snapshot.environment.toxicity,
            3.0,
            TOXICITY_THRESHOLD,
            TOXICITY,
        );
    }
    for agent in snapshot.alive_agents() {
        draw_agent(surface, agent);
    }
}

/// Paint cells with opacity `value / (scale * base)`, skipping cells whose
/// normalised value does not exceed `threshold`.
fn paint_field<S: Surface + ?Sized>(
    surface: &mut S,
    field: &Field,
    scale: f64,
    threshold: f64,
    color: Rgba,
) {
    let full = field.base() * scale;
    if full <= 0.0 {
        return;
    }
    let size = [field.cell_width(), field.cell_height()];
    for (cx, cy, value) in field.cells() {
        let norm = (value / full).min(1.0);
        if norm <= threshold {
            continue;
        }
        let origin = [cx as f64 * size[0], cy as f64 * size[1]];
        surface.fill_rect(origin, size, color.with_opacity(norm * OVERLAY_MAX_OPACITY));
    }
}

fn draw_agent<S: Surface + ?Sized>(surface: &mut S, agent: &Agent) {
    let traits = agent.traits();
    let position = agent.position();
    surface.fill_circle(position, traits.size, agent_color(traits));

    let [vx, vy] = agent.velocity();
    let norm = vx.hypot(vy);
    if norm > 0.0 {
        let length = traits.size * 2.0;
        let tip = [
            position[0] + vx / norm * length,
            position[1] + vy / norm * length,
        ];
        surface.line(position, tip, HEADING);
    }
}

/// Resistance drives hue (red to blue), metabolism saturation and speed
/// lightness.
pub fn agent_color(traits: &Traits) -> Rgba {
    let hue = (traits.resistance * 120.0).clamp(0.0, 240.0);
    let saturation = (50.0 + traits.metabolism * 25.0).clamp(0.0, 100.0) / 100.0;
    let lightness = (30.0 + traits.speed * 20.0).clamp(20.0, 80.0) / 100.0;
    let [r, g, b] = hsl_to_rgb(hue, saturation, lightness);
    Rgba::opaque(r, g, b)
}

/// `hue` in degrees, `saturation` and `lightness` in `[0, 1]`.
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> [u8; 3] {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);
    let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = l - chroma / 2.0;
    let to_byte = |c: f64| ((c + m).clamp(0.0, 1.0) * 255.0).round() as u8;
    [to_byte(r), to_byte(g), to_byte(b)]
}
