/// Capabilities the engine needs from the host's 2D drawing surface
use crate::transform::{Mat3, Vec2, Vec3};

/// An 8-bit RGB color with a fractional alpha, as canvas-like surfaces take it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Floor each component of a 0–255 color vector, clamping out-of-range values
    pub fn from_components(c: &Vec3, alpha: f64) -> Self {
        let channel = |v: f64| v.floor().clamp(0.0, 255.0) as u8;
        Self {
            r: channel(c.x),
            g: channel(c.y),
            b: channel(c.z),
            a: alpha.clamp(0.0, 1.0),
        }
    }
}

/// Source of texture images, keyed by an opaque source identifier.
///
/// Loading may be asynchronous: an image that is not ready yet reports `None`
/// and the engine draws the polygon untextured until it becomes available.
pub trait ImageProvider {
    fn image_size(&self, source: &str) -> Option<(u32, u32)>;
}

/// A canvas-style immediate mode drawing target
pub trait DrawingSurface: ImageProvider {
    /// Width and height in pixels
    fn size(&self) -> (u32, u32);
    fn clear(&mut self);
    fn begin_path(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn close_path(&mut self);
    /// Fill the current path
    fn fill(&mut self, color: Rgba);
    /// Push the clip state
    fn save(&mut self);
    /// Pop the clip state and drop any image transform
    fn restore(&mut self);
    /// Intersect the clip region with the current path
    fn clip(&mut self);
    /// Blit an image whose pixel (u, v) lands at `transform · (u, v, 1)`
    fn draw_image(&mut self, source: &str, transform: &Mat3);
    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Rgba);
}

/// Build a closed path through `points`
pub fn trace_path(surface: &mut dyn DrawingSurface, points: &[Vec2]) {
    surface.begin_path();
    if let Some((first, rest)) = points.split_first() {
        surface.move_to(first.x, first.y);
        for p in rest {
            surface.line_to(p.x, p.y);
        }
    }
    surface.close_path();
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Op {
        Clear,
        BeginPath,
        MoveTo(f64, f64),
        LineTo(f64, f64),
        ClosePath,
        Fill(Rgba),
        Save,
        Restore,
        Clip,
        DrawImage(String, Mat3),
        Text(String),
    }

    /// Records every call so tests can inspect what a frame drew
    pub struct RecordingSurface {
        pub width: u32,
        pub height: u32,
        pub images: HashMap<String, (u32, u32)>,
        pub ops: Vec<Op>,
    }

    impl RecordingSurface {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                images: HashMap::new(),
                ops: Vec::new(),
            }
        }

        pub fn fills(&self) -> Vec<Rgba> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Fill(c) => Some(*c),
                    _ => None,
                })
                .collect()
        }

        pub fn count(&self, wanted: &Op) -> usize {
            self.ops.iter().filter(|op| *op == wanted).count()
        }
    }

    impl ImageProvider for RecordingSurface {
        fn image_size(&self, source: &str) -> Option<(u32, u32)> {
            self.images.get(source).copied()
        }
    }

    impl DrawingSurface for RecordingSurface {
        fn size(&self) -> (u32, u32) {
            (self.width, self.height)
        }
        fn clear(&mut self) {
            self.ops.push(Op::Clear);
        }
        fn begin_path(&mut self) {
            self.ops.push(Op::BeginPath);
        }
        fn move_to(&mut self, x: f64, y: f64) {
            self.ops.push(Op::MoveTo(x, y));
        }
        fn line_to(&mut self, x: f64, y: f64) {
            self.ops.push(Op::LineTo(x, y));
        }
        fn close_path(&mut self) {
            self.ops.push(Op::ClosePath);
        }
        fn fill(&mut self, color: Rgba) {
            self.ops.push(Op::Fill(color));
        }
        fn save(&mut self) {
            self.ops.push(Op::Save);
        }
        fn restore(&mut self) {
            self.ops.push(Op::Restore);
        }
        fn clip(&mut self) {
            self.ops.push(Op::Clip);
        }
        fn draw_image(&mut self, source: &str, transform: &Mat3) {
            self.ops.push(Op::DrawImage(source.to_string(), *transform));
        }
        fn fill_text(&mut self, text: &str, _x: f64, _y: f64, _color: Rgba) {
            self.ops.push(Op::Text(text.to_string()));
        }
    }
}
