/// `DrawingSurface` over a 2D canvas context
use k3d_core::transform::Mat3;
use k3d_core::{DrawingSurface, ImageProvider, Rgba};
use std::collections::HashMap;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

/// Draws onto an HTML canvas; textures are `<img>` elements loading in the
/// background.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    images: HashMap<String, HtmlImageElement>,
}

impl CanvasSurface {
    /// Attach to the canvas with DOM id `canvas_id`
    pub fn from_id(canvas_id: &str) -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document available"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element with id {}", canvas_id)))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str(&format!("{} is not a canvas", canvas_id)))?;
        Self::new(canvas)
    }

    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self {
            canvas,
            context,
            images: HashMap::new(),
        })
    }

    /// Start fetching `url`; the texture is used once the browser has it
    pub fn load_image(&mut self, source: &str, url: &str) -> Result<(), JsValue> {
        let image = HtmlImageElement::new()?;
        image.set_src(url);
        log::debug!("loading texture {} from {}", source, url);
        self.images.insert(source.to_string(), image);
        Ok(())
    }
}

impl ImageProvider for CanvasSurface {
    fn image_size(&self, source: &str) -> Option<(u32, u32)> {
        let image = self.images.get(source)?;
        (image.complete() && image.natural_width() > 0)
            .then(|| (image.natural_width(), image.natural_height()))
    }
}

impl DrawingSurface for CanvasSurface {
    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn clear(&mut self) {
        let (width, height) = self.size();
        self.context.clear_rect(0.0, 0.0, width as f64, height as f64);
    }

    fn begin_path(&mut self) {
        self.context.begin_path();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.context.move_to(x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.context.line_to(x, y);
    }

    fn close_path(&mut self) {
        self.context.close_path();
    }

    fn fill(&mut self, color: Rgba) {
        self.context.set_fill_style_str(&css_color(color));
        self.context.fill();
    }

    fn save(&mut self) {
        self.context.save();
    }

    fn restore(&mut self) {
        self.context.restore();
    }

    fn clip(&mut self) {
        self.context.clip();
    }

    fn draw_image(&mut self, source: &str, transform: &Mat3) {
        let Some(image) = self.images.get(source) else {
            return;
        };
        let [a, b, c, d, e, f] = canvas_transform(transform);
        let drawn = self
            .context
            .set_transform(a, b, c, d, e, f)
            .and_then(|_| self.context.draw_image_with_html_image_element(image, 0.0, 0.0));
        if let Err(err) = drawn {
            log::warn!("drawing texture {} failed: {:?}", source, err);
        }
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Rgba) {
        self.context.set_fill_style_str(&css_color(color));
        if let Err(err) = self.context.fill_text(text, x, y) {
            log::warn!("fill_text failed: {:?}", err);
        }
    }
}

/// `rgba(r,g,b,a)` as the canvas fill style takes it
pub fn css_color(color: Rgba) -> String {
    format!("rgba({},{},{},{})", color.r, color.g, color.b, color.a)
}

/// The six `setTransform` arguments for a 2D affine matrix
pub fn canvas_transform(m: &Mat3) -> [f64; 6] {
    [m[(0, 0)], m[(1, 0)], m[(0, 1)], m[(1, 1)], m[(0, 2)], m[(1, 2)]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_color() {
        assert_eq!(css_color(Rgba::opaque(255, 127, 0)), "rgba(255,127,0,1)");
        let faded = Rgba { r: 1, g: 2, b: 3, a: 0.25 };
        assert_eq!(css_color(faded), "rgba(1,2,3,0.25)");
    }

    #[test]
    fn test_canvas_transform_order() {
        let m = Mat3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 0.0, 0.0, 1.0);
        assert_eq!(canvas_transform(&m), [1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }
}
