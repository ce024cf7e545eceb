use anyhow::{Context, Result};
use image::RgbaImage;
use petri_core::render::{Rgba, Surface};
use petri_core::Extent;
use std::path::Path;

/// Raster [`Surface`] over an `image` buffer, with source-over alpha blending.
pub struct PngCanvas {
    image: RgbaImage,
    scale: f64,
}

impl PngCanvas {
    pub const MAX_DIMENSION: u32 = 8192;

    /// A canvas covering `extent`, `scale` pixels per world unit.
    pub fn new(extent: Extent, scale: f64) -> Self {
        let dim = |len: f64| ((len * scale).round().max(1.0) as u32).min(Self::MAX_DIMENSION);
        Self {
            image: RgbaImage::new(dim(extent.width), dim(extent.height)),
            scale,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.image
            .save(path)
            .with_context(|| format!("failed to write image to {}", path.display()))
    }

    fn to_pixels(&self, v: f64) -> f64 {
        v * self.scale
    }

    fn blend(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 || x >= i64::from(self.width()) || y >= i64::from(self.height()) {
            return;
        }
        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        let alpha = f64::from(color.a) / 255.0;
        let src = [color.r, color.g, color.b];
        for (dst, src) in pixel.0.iter_mut().zip(src) {
            *dst = (f64::from(src) * alpha + f64::from(*dst) * (1.0 - alpha)).round() as u8;
        }
        pixel.0[3] = 255;
    }

    fn clamp_span(&self, from: f64, to: f64, limit: u32) -> (i64, i64) {
        let lo = (from.round() as i64).max(0);
        let hi = (to.round() as i64).min(i64::from(limit));
        (lo, hi)
    }
}

impl Surface for PngCanvas {
    fn fill_background(&mut self, color: Rgba) {
        for pixel in self.image.pixels_mut() {
            *pixel = image::Rgba([color.r, color.g, color.b, color.a]);
        }
    }

    fn fill_rect(&mut self, origin: [f64; 2], size: [f64; 2], color: Rgba) {
        let (x0, x1) = self.clamp_span(
            self.to_pixels(origin[0]),
            self.to_pixels(origin[0] + size[0]),
            self.width(),
        );
        let (y0, y1) = self.clamp_span(
            self.to_pixels(origin[1]),
            self.to_pixels(origin[1] + size[1]),
            self.height(),
        );
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, color);
            }
        }
    }

    fn fill_circle(&mut self, center: [f64; 2], radius: f64, color: Rgba) {
        let cx = self.to_pixels(center[0]);
        let cy = self.to_pixels(center[1]);
        // Keep sub-pixel agents visible.
        let r = self.to_pixels(radius).max(0.5);
        let (x0, x1) = self.clamp_span((cx - r).floor(), (cx + r).ceil(), self.width());
        let (y0, y1) = self.clamp_span((cy - r).floor(), (cy + r).ceil(), self.height());
        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                if dx * dx + dy * dy <= r * r {
                    self.blend(x, y, color);
                }
            }
        }
    }

    fn line(&mut self, from: [f64; 2], to: [f64; 2], color: Rgba) {
        let a = [self.to_pixels(from[0]), self.to_pixels(from[1])];
        let b = [self.to_pixels(to[0]), self.to_pixels(to[1])];
        let bounds = [f64::from(self.width()), f64::from(self.height())];
        // Stepping is bounded by the canvas diagonal once clipped.
        let Some(([x0, y0], [x1, y1])) = clip_segment(a, b, bounds) else {
            return;
        };
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as usize;
        let mut last = None;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let px = (x0 + (x1 - x0) * t).floor() as i64;
            let py = (y0 + (y1 - y0) * t).floor() as i64;
            if last == Some((px, py)) {
                continue;
            }
            last = Some((px, py));
            self.blend(px, py, color);
        }
    }
}

/// Clip the segment `a`-`b` to `[0, w] x [0, h]` (Liang-Barsky).
///
/// `None` when the segment misses the box or has a non-finite endpoint.
fn clip_segment(a: [f64; 2], b: [f64; 2], [w, h]: [f64; 2]) -> Option<([f64; 2], [f64; 2])> {
    if !a.iter().chain(&b).all(|v| v.is_finite()) {
        return None;
    }
    let d = [b[0] - a[0], b[1] - a[1]];
    if !d[0].is_finite() || !d[1].is_finite() {
        return None;
    }
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    let edges = [
        (-d[0], a[0]),
        (d[0], w - a[0]),
        (-d[1], a[1]),
        (d[1], h - a[1]),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    let at = |t: f64| [a[0] + d[0] * t, a[1] + d[1] * t];
    Some((at(t0), at(t1)))
}
