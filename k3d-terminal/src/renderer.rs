/// Half-block framebuffer that implements the engine's drawing surface
use crossterm::{
    cursor::MoveTo,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use image::RgbaImage;
use k3d_core::transform::{Mat3, Vec2, Vec3};
use k3d_core::{DrawingSurface, ImageProvider, Rgba};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// Upper half block: foreground paints the top pixel, background the bottom
const HALF_BLOCK: char = '▀';

type Pixel = [u8; 3];

/// Text queued by `fill_text`, printed over the pixels
#[derive(Debug, Clone, PartialEq)]
struct Label {
    col: u16,
    row: u16,
    text: String,
    color: Pixel,
}

/// An RGB framebuffer with two pixels per terminal cell.
///
/// Paths are filled with the even-odd rule at pixel centers. Clipping is a
/// per-pixel mask kept on a save/restore stack.
pub struct Framebuffer {
    width: u32,
    height: u32,
    background: Pixel,
    pixels: Vec<Pixel>,
    path: Vec<Vec<Vec2>>,
    clip: Option<Vec<bool>>,
    saved: Vec<Option<Vec<bool>>>,
    textures: HashMap<String, RgbaImage>,
    labels: Vec<Label>,
}

impl Framebuffer {
    /// A framebuffer covering `cols`×`rows` terminal cells
    pub fn new(cols: u16, rows: u16) -> Self {
        let (width, height) = (cols as u32, rows as u32 * 2);
        let background = [0, 0, 0];
        Self {
            width,
            height,
            background,
            pixels: vec![background; (width * height) as usize],
            path: Vec::new(),
            clip: None,
            saved: Vec::new(),
            textures: HashMap::new(),
            labels: Vec::new(),
        }
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        log::debug!("framebuffer resized to {}x{} cells", cols, rows);
        self.width = cols as u32;
        self.height = rows as u32 * 2;
        self.pixels = vec![self.background; (self.width * self.height) as usize];
        self.clip = None;
        self.saved.clear();
    }

    pub fn set_background(&mut self, r: u8, g: u8, b: u8) {
        self.background = [r, g, b];
    }

    /// Decode an image file and register it under `source`
    pub fn load_image(&mut self, source: &str, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
        let image = image::open(path.as_ref())?.to_rgba8();
        log::debug!(
            "loaded texture {} ({}x{}) from {}",
            source,
            image.width(),
            image.height(),
            path.as_ref().display()
        );
        self.insert_image(source, image);
        Ok(())
    }

    pub fn insert_image(&mut self, source: &str, image: RgbaImage) {
        self.textures.insert(source.to_string(), image);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        (x < self.width && y < self.height).then(|| self.pixels[self.index(x, y)])
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    /// Pixel bounding box of the current path, clipped to the framebuffer
    fn path_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let mut points = self.path.iter().flatten();
        let first = points.next()?;
        let (mut min, mut max) = (*first, *first);
        for p in points {
            min = min.inf(p);
            max = max.sup(p);
        }
        bounds(min, max, self.width, self.height)
    }

    fn path_contains(&self, x: f64, y: f64) -> bool {
        self.path.iter().fold(false, |inside, sub| inside ^ polygon_contains(sub, x, y))
    }

    fn clipped(&self, idx: usize) -> bool {
        self.clip.as_ref().is_some_and(|mask| !mask[idx])
    }

    /// Print the frame starting at terminal row `top`
    pub fn draw<W: Write>(&self, writer: &mut W, top: u16) -> std::io::Result<()> {
        for row in 0..self.height / 2 {
            writer.queue(MoveTo(0, top + row as u16))?;
            for col in 0..self.width {
                let upper = self.pixels[self.index(col, row * 2)];
                let lower = self.pixels[self.index(col, row * 2 + 1)];
                writer.queue(SetForegroundColor(rgb(upper)))?;
                writer.queue(SetBackgroundColor(rgb(lower)))?;
                writer.queue(Print(HALF_BLOCK))?;
            }
        }
        writer.queue(ResetColor)?;

        for label in &self.labels {
            writer.queue(MoveTo(label.col, top + label.row))?;
            writer.queue(SetForegroundColor(rgb(label.color)))?;
            writer.queue(Print(&label.text))?;
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl ImageProvider for Framebuffer {
    fn image_size(&self, source: &str) -> Option<(u32, u32)> {
        self.textures.get(source).map(|image| image.dimensions())
    }
}

impl DrawingSurface for Framebuffer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.pixels.fill(self.background);
        self.labels.clear();
    }

    fn begin_path(&mut self) {
        self.path.clear();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.path.push(vec![Vec2::new(x, y)]);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        match self.path.last_mut() {
            Some(sub) => sub.push(Vec2::new(x, y)),
            None => self.path.push(vec![Vec2::new(x, y)]),
        }
    }

    fn close_path(&mut self) {}

    fn fill(&mut self, color: Rgba) {
        let Some((min_x, min_y, max_x, max_y)) = self.path_bounds() else {
            return;
        };
        let src = [color.r, color.g, color.b];
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let idx = self.index(x, y);
                if self.clipped(idx) || !self.path_contains(x as f64 + 0.5, y as f64 + 0.5) {
                    continue;
                }
                blend(&mut self.pixels[idx], src, color.a);
            }
        }
    }

    fn save(&mut self) {
        self.saved.push(self.clip.clone());
    }

    fn restore(&mut self) {
        if let Some(clip) = self.saved.pop() {
            self.clip = clip;
        }
    }

    fn clip(&mut self) {
        let mut mask = vec![false; self.pixels.len()];
        if let Some((min_x, min_y, max_x, max_y)) = self.path_bounds() {
            for y in min_y..=max_y {
                for x in min_x..=max_x {
                    let idx = self.index(x, y);
                    mask[idx] = !self.clipped(idx)
                        && self.path_contains(x as f64 + 0.5, y as f64 + 0.5);
                }
            }
        }
        self.clip = Some(mask);
    }

    fn draw_image(&mut self, source: &str, transform: &Mat3) {
        let Some(image) = self.textures.get(source) else {
            return;
        };
        let Some(inverse) = transform.try_inverse() else {
            log::trace!("skipping degenerate image transform for {}", source);
            return;
        };

        let (w, h) = (image.width() as f64, image.height() as f64);
        let corners = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]
            .map(|(u, v)| {
                let p = transform * Vec3::new(u, v, 1.0);
                Vec2::new(p.x, p.y)
            });
        let min = corners.iter().fold(corners[0], |m, p| m.inf(p));
        let max = corners.iter().fold(corners[0], |m, p| m.sup(p));
        let Some((min_x, min_y, max_x, max_y)) = bounds(min, max, self.width, self.height) else {
            return;
        };

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let idx = (y * self.width + x) as usize;
                if self.clip.as_ref().is_some_and(|mask| !mask[idx]) {
                    continue;
                }
                let uv = inverse * Vec3::new(x as f64 + 0.5, y as f64 + 0.5, 1.0);
                if uv.x < 0.0 || uv.y < 0.0 || uv.x >= w || uv.y >= h {
                    continue;
                }
                let texel = image.get_pixel(uv.x as u32, uv.y as u32).0;
                let alpha = texel[3] as f64 / 255.0;
                blend(&mut self.pixels[idx], [texel[0], texel[1], texel[2]], alpha);
            }
        }
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Rgba) {
        self.labels.push(Label {
            col: x.max(0.0) as u16,
            row: (y.max(0.0) / 2.0) as u16,
            text: text.to_string(),
            color: [color.r, color.g, color.b],
        });
    }
}

/// Even-odd crossing test against one closed subpath
fn polygon_contains(points: &[Vec2], x: f64, y: f64) -> bool {
    if points.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (a, b) = (points[i], points[j]);
        if (a.y > y) != (b.y > y) && x < (b.x - a.x) * (y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Integer pixel box covering `min..max`, or `None` when it misses the screen
fn bounds(min: Vec2, max: Vec2, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
        return None;
    }
    if max.x < 0.0 || max.y < 0.0 || min.x >= width as f64 || min.y >= height as f64 || width == 0 || height == 0 {
        return None;
    }
    let min_x = min.x.floor().max(0.0) as u32;
    let min_y = min.y.floor().max(0.0) as u32;
    let max_x = (max.x.ceil() as u32).min(width - 1);
    let max_y = (max.y.ceil() as u32).min(height - 1);
    Some((min_x, min_y, max_x, max_y))
}

fn blend(dst: &mut Pixel, src: Pixel, alpha: f64) {
    let alpha = alpha.clamp(0.0, 1.0);
    for (d, s) in dst.iter_mut().zip(src) {
        *d = (s as f64 * alpha + *d as f64 * (1.0 - alpha)).round() as u8;
    }
}

fn rgb([r, g, b]: Pixel) -> Color {
    Color::Rgb { r, g, b }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba as ImageRgba;

    fn square(fb: &mut Framebuffer, x0: f64, y0: f64, x1: f64, y1: f64) {
        fb.begin_path();
        fb.move_to(x0, y0);
        fb.line_to(x1, y0);
        fb.line_to(x1, y1);
        fb.line_to(x0, y1);
        fb.close_path();
    }

    #[test]
    fn test_cells_hold_two_pixels() {
        let fb = Framebuffer::new(20, 10);
        assert_eq!(fb.size(), (20, 20));
    }

    #[test]
    fn test_fill_covers_pixel_centers() {
        let mut fb = Framebuffer::new(10, 5);
        square(&mut fb, 2.0, 2.0, 6.0, 5.0);
        fb.fill(Rgba::opaque(200, 10, 20));

        assert_eq!(fb.pixel(2, 2), Some([200, 10, 20]));
        assert_eq!(fb.pixel(5, 4), Some([200, 10, 20]));
        assert_eq!(fb.pixel(6, 4), Some([0, 0, 0]));
        assert_eq!(fb.pixel(1, 3), Some([0, 0, 0]));
    }

    #[test]
    fn test_fill_blends_alpha() {
        let mut fb = Framebuffer::new(4, 2);
        fb.set_background(100, 100, 100);
        fb.clear();
        square(&mut fb, 0.0, 0.0, 4.0, 4.0);
        fb.fill(Rgba { r: 200, g: 0, b: 100, a: 0.5 });
        assert_eq!(fb.pixel(1, 1), Some([150, 50, 100]));
    }

    #[test]
    fn test_clip_limits_fill_until_restore() {
        let mut fb = Framebuffer::new(10, 5);
        fb.save();
        square(&mut fb, 0.0, 0.0, 3.0, 3.0);
        fb.clip();
        square(&mut fb, 0.0, 0.0, 10.0, 10.0);
        fb.fill(Rgba::opaque(255, 255, 255));
        assert_eq!(fb.pixel(1, 1), Some([255, 255, 255]));
        assert_eq!(fb.pixel(5, 5), Some([0, 0, 0]));

        fb.restore();
        fb.fill(Rgba::opaque(9, 9, 9));
        assert_eq!(fb.pixel(5, 5), Some([9, 9, 9]));
    }

    #[test]
    fn test_draw_image_follows_transform() {
        let mut fb = Framebuffer::new(10, 5);
        let mut image = RgbaImage::from_pixel(2, 2, ImageRgba([10, 20, 30, 255]));
        image.put_pixel(1, 1, ImageRgba([250, 0, 0, 255]));
        fb.insert_image("tex", image);
        assert_eq!(fb.image_size("tex"), Some((2, 2)));
        assert_eq!(fb.image_size("missing"), None);

        // Shift by (4, 3) and scale by 2.
        let m = Mat3::new(2.0, 0.0, 4.0, 0.0, 2.0, 3.0, 0.0, 0.0, 1.0);
        fb.draw_image("tex", &m);

        assert_eq!(fb.pixel(4, 3), Some([10, 20, 30]));
        assert_eq!(fb.pixel(7, 6), Some([250, 0, 0]));
        assert_eq!(fb.pixel(8, 7), Some([0, 0, 0]));
        assert_eq!(fb.pixel(3, 3), Some([0, 0, 0]));
    }

    #[test]
    fn test_degenerate_image_transform_is_skipped() {
        let mut fb = Framebuffer::new(4, 2);
        fb.insert_image("tex", RgbaImage::from_pixel(2, 2, ImageRgba([255, 255, 255, 255])));
        fb.draw_image("tex", &Mat3::zeros());
        assert!((0..4).all(|x| fb.pixel(x, 0) == Some([0, 0, 0])));
    }

    #[test]
    fn test_draw_emits_half_blocks_and_labels() {
        let mut fb = Framebuffer::new(3, 1);
        fb.fill_text("hi", 1.0, 0.0, Rgba::opaque(255, 255, 0));
        let mut out = Vec::new();
        fb.draw(&mut out, 0).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches(HALF_BLOCK).count(), 3);
        assert!(text.contains("hi"));

        fb.clear();
        let mut out = Vec::new();
        fb.draw(&mut out, 0).unwrap();
        assert!(!String::from_utf8(out).unwrap().contains("hi"));
    }

    #[test]
    fn test_even_odd_subpaths_leave_hole() {
        let mut fb = Framebuffer::new(10, 5);
        fb.begin_path();
        for (x0, y0, x1, y1) in [(0.0, 0.0, 10.0, 10.0), (3.0, 3.0, 6.0, 6.0)] {
            fb.move_to(x0, y0);
            fb.line_to(x1, y0);
            fb.line_to(x1, y1);
            fb.line_to(x0, y1);
        }
        fb.fill(Rgba::opaque(1, 2, 3));
        assert_eq!(fb.pixel(1, 1), Some([1, 2, 3]));
        assert_eq!(fb.pixel(4, 4), Some([0, 0, 0]));
    }
}
