/// Polygons: planar faces with flat or textured shading
use std::borrow::Cow;
use std::f64::consts::FRAC_PI_2;

use crate::light::Light;
use crate::projection::Projection;
use crate::surface::{trace_path, DrawingSurface, Rgba};
use crate::transform::{angle_between, Mat3, Transform, Vec2, Vec3};

/// Everything a polygon needs from the scene to draw itself
pub struct RenderContext<'a> {
    pub projection: &'a Projection,
    pub camera_direction: Vec3,
    pub light: &'a Light,
}

/// An image mapped onto a polygon
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// Identifier handed to the surface's image provider
    pub source: String,
    /// Texel coordinates per vertex; `None` maps the image corners
    pub coords: Option<Vec<Vec2>>,
}

impl Texture {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            coords: None,
        }
    }

    pub fn with_coords(mut self, coords: Vec<Vec2>) -> Self {
        self.coords = Some(coords);
        self
    }

    /// Texel coordinates for an image of the given size
    pub fn resolve_coords(&self, (width, height): (u32, u32)) -> Cow<'_, [Vec2]> {
        match &self.coords {
            Some(coords) => Cow::Borrowed(coords),
            None => {
                let tw = width.saturating_sub(1) as f64;
                let th = height.saturating_sub(1) as f64;
                Cow::Owned(vec![
                    Vec2::new(0.0, 0.0),
                    Vec2::new(0.0, th),
                    Vec2::new(tw, th),
                    Vec2::new(tw, 0.0),
                ])
            }
        }
    }
}

/// A planar, convex face owned by one object.
///
/// Coplanarity and convexity are assumed, not checked. The vertex winding
/// decides the normal and therefore the visible side.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Vec3>,
    center: Vec3,
    /// Base color, components in `[0, 1]`
    pub color: Vec3,
    pub texture: Option<Texture>,
    pub no_light: bool,
    pub show_back: bool,
}

impl Polygon {
    /// A white polygon through `vertices` (at least three)
    pub fn new(vertices: Vec<Vec3>) -> Self {
        debug_assert!(vertices.len() >= 3, "a polygon needs at least three vertices");
        let center = mean(&vertices);
        Self {
            vertices,
            center,
            color: Vec3::new(1.0, 1.0, 1.0),
            texture: None,
            no_light: false,
            show_back: false,
        }
    }

    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    pub fn with_texture(mut self, texture: Texture) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn without_light(mut self) -> Self {
        self.no_light = true;
        self
    }

    pub fn with_back_side(mut self) -> Self {
        self.show_back = true;
        self
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Mean of the vertices
    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn set_vertices(&mut self, vertices: Vec<Vec3>) {
        self.center = mean(&vertices);
        self.vertices = vertices;
    }

    /// `normalize((v1 − v0) × (v2 − v0))`
    pub fn normal(&self) -> Vec3 {
        let v0v1 = self.vertices[1] - self.vertices[0];
        let v0v2 = self.vertices[2] - self.vertices[0];
        v0v1.cross(&v0v2).normalize()
    }

    /// Faces whose normal is within 90° of the view direction are hidden
    /// unless `show_back` is set.
    pub fn is_visible_from(&self, camera_direction: &Vec3) -> bool {
        self.show_back || angle_between(camera_direction, &self.normal()) >= FRAC_PI_2
    }

    /// NDC depth of the center, used for back-to-front sorting
    pub fn depth(&self, projection: &Projection) -> f64 {
        projection.to_ndc(&self.center).z
    }

    /// Whether `segment` crosses the plane test surface of this polygon.
    ///
    /// The endpoints are classified by the sign of `normal · p − π/2`; a sign
    /// change (or touching zero) counts as a crossing. This is a coarse plane
    /// test, not a bounded face intersection.
    pub fn crosses(&self, segment: &[Vec3; 2]) -> bool {
        let normal = self.normal();
        let side = |p: &Vec3| normal.dot(p) - FRAC_PI_2;
        side(&segment[0]) * side(&segment[1]) <= 0.0
    }

    pub(crate) fn translate(&mut self, delta: &Vec3) {
        self.center += delta;
        for v in &mut self.vertices {
            *v += delta;
        }
    }

    pub(crate) fn rotate_about(&mut self, pivot: &Vec3, r: &Mat3) {
        self.center = r * (self.center - pivot) + pivot;
        for v in &mut self.vertices {
            *v = r * (*v - pivot) + pivot;
        }
    }

    pub(crate) fn scale_about(&mut self, pivot: &Vec3, factors: &Vec3) {
        for v in &mut self.vertices {
            *v = (*v - pivot).component_mul(factors) + pivot;
        }
        self.center = mean(&self.vertices);
    }

    /// Rasterize onto `surface`
    pub fn draw(&self, ctx: &RenderContext<'_>, surface: &mut dyn DrawingSurface) {
        if !self.is_visible_from(&ctx.camera_direction) {
            return;
        }

        let points: Vec<Vec2> = self
            .vertices
            .iter()
            .map(|v| ctx.projection.to_screen(v))
            .collect();
        let shade = angle_between(&self.normal(), &ctx.light.direction)
            .cos()
            .abs();

        let mapping = self.texture.as_ref().and_then(|texture| {
            let size = surface.image_size(&texture.source)?;
            let coords = texture.resolve_coords(size);
            (coords.len() >= points.len()).then(|| (texture.source.as_str(), coords))
        });

        match mapping {
            Some((source, coords)) => self.draw_textured(ctx, surface, &points, source, &coords, shade),
            None => self.draw_flat(ctx, surface, &points, shade),
        }
    }

    fn draw_flat(
        &self,
        ctx: &RenderContext<'_>,
        surface: &mut dyn DrawingSurface,
        points: &[Vec2],
        shade: f64,
    ) {
        let light = ctx.light;
        let diffuse = self.color.component_mul(&light.color) * shade;
        let color = self.color * 255.0 * light.ambient + diffuse * light.diffuse;

        trace_path(surface, points);
        surface.fill(Rgba::from_components(&color, 1.0));
    }

    fn draw_textured(
        &self,
        ctx: &RenderContext<'_>,
        surface: &mut dyn DrawingSurface,
        points: &[Vec2],
        source: &str,
        coords: &[Vec2],
        shade: f64,
    ) {
        let overlay = (!self.no_light).then(|| {
            let tint = self.color.component_mul(&ctx.light.color) * shade;
            Rgba::from_components(&tint, 1.0 - shade / 1.2)
        });

        for i in 1..points.len() - 1 {
            let triangle = [points[0], points[i], points[i + 1]];

            surface.save();
            trace_path(surface, &triangle);
            surface.clip();

            let m = Transform::affine_matrix([coords[0], coords[i], coords[i + 1]], triangle);
            surface.draw_image(source, &m);

            if let Some(color) = overlay {
                surface.fill(color);
            }
            surface.restore();
        }
    }
}

fn mean(vertices: &[Vec3]) -> Vec3 {
    vertices.iter().sum::<Vec3>() / vertices.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::projection::ProjectionConfig;
    use crate::surface::testing::{Op, RecordingSurface};

    fn square() -> Polygon {
        // Counter-clockwise seen from +z, so the normal points at +z.
        Polygon::new(vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ])
    }

    /// Camera at z = 10 looking back at the origin
    fn facing_square() -> (Projection, Vec3) {
        let direction = Vec3::new(0.0, 0.0, -1.0);
        let frame = Frame::new(Vec3::new(0.0, 0.0, 10.0), direction, Vec3::new(0.0, 1.0, 0.0));
        (Projection::new(200, 200, ProjectionConfig::default(), &frame), direction)
    }

    #[test]
    fn test_center_tracks_vertices() {
        let mut polygon = square();
        assert_eq!(polygon.center(), Vec3::zeros());
        polygon.set_vertices(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(0.0, 3.0, 0.0),
        ]);
        assert_eq!(polygon.center(), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_normal_follows_winding() {
        assert_eq!(square().normal(), Vec3::new(0.0, 0.0, 1.0));
        let mut reversed = square().vertices().to_vec();
        reversed.reverse();
        assert_eq!(Polygon::new(reversed).normal(), Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_visibility_polarity() {
        let polygon = square();
        assert!(polygon.is_visible_from(&Vec3::new(0.0, 0.0, -1.0)));
        assert!(!polygon.is_visible_from(&Vec3::new(0.0, 0.0, 1.0)));
        assert!(polygon.with_back_side().is_visible_from(&Vec3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_crossing_uses_offset_plane() {
        let polygon = square();
        // normal · p must straddle π/2, not zero
        assert!(polygon.crosses(&[Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 2.0)]));
        assert!(!polygon.crosses(&[Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.0, 1.0)]));
        assert!(!polygon.crosses(&[Vec3::new(5.0, 0.0, 2.0), Vec3::new(0.0, 3.0, 3.0)]));
    }

    #[test]
    fn test_flat_fill_color() {
        let (projection, camera_direction) = facing_square();
        let light = Light::default();
        let ctx = RenderContext { projection: &projection, camera_direction, light: &light };
        let mut surface = RecordingSurface::new(200, 200);

        square().with_color(Vec3::new(1.0, 0.5, 0.0)).draw(&ctx, &mut surface);

        // Light hits head on: 0.2·255·c + 0.8·255·c
        assert_eq!(surface.fills(), vec![Rgba::opaque(255, 127, 0)]);
        assert_eq!(surface.count(&Op::ClosePath), 1);
    }

    #[test]
    fn test_hidden_face_draws_nothing() {
        let (projection, _) = facing_square();
        let light = Light::default();
        let ctx = RenderContext {
            projection: &projection,
            camera_direction: Vec3::new(0.0, 0.0, 1.0),
            light: &light,
        };
        let mut surface = RecordingSurface::new(200, 200);
        square().draw(&ctx, &mut surface);
        assert!(surface.ops.is_empty());
    }

    #[test]
    fn test_unloaded_texture_falls_back_to_flat() {
        let (projection, camera_direction) = facing_square();
        let light = Light::default();
        let ctx = RenderContext { projection: &projection, camera_direction, light: &light };
        let mut surface = RecordingSurface::new(200, 200);

        square().with_texture(Texture::new("brick")).draw(&ctx, &mut surface);

        assert_eq!(surface.fills().len(), 1);
        assert_eq!(surface.count(&Op::Clip), 0);
    }

    #[test]
    fn test_textured_fan_clips_each_triangle() {
        let (projection, camera_direction) = facing_square();
        let light = Light::default();
        let ctx = RenderContext { projection: &projection, camera_direction, light: &light };
        let mut surface = RecordingSurface::new(200, 200);
        surface.images.insert("brick".to_string(), (64, 32));

        square().with_texture(Texture::new("brick")).draw(&ctx, &mut surface);

        assert_eq!(surface.count(&Op::Clip), 2);
        assert_eq!(surface.count(&Op::Save), 2);
        assert_eq!(surface.count(&Op::Restore), 2);
        let blits = surface
            .ops
            .iter()
            .filter(|op| matches!(op, Op::DrawImage(source, _) if source == "brick"))
            .count();
        assert_eq!(blits, 2);

        // Head-on light leaves the overlay mostly transparent.
        let overlay = surface.fills();
        assert_eq!(overlay.len(), 2);
        assert!((overlay[0].a - (1.0 - 1.0 / 1.2)).abs() < 1e-9);
    }

    #[test]
    fn test_unlit_texture_has_no_overlay() {
        let (projection, camera_direction) = facing_square();
        let light = Light::default();
        let ctx = RenderContext { projection: &projection, camera_direction, light: &light };
        let mut surface = RecordingSurface::new(200, 200);
        surface.images.insert("brick".to_string(), (64, 32));

        square()
            .with_texture(Texture::new("brick"))
            .without_light()
            .draw(&ctx, &mut surface);

        assert!(surface.fills().is_empty());
        assert_eq!(surface.count(&Op::Clip), 2);
    }

    #[test]
    fn test_default_texture_coords_are_corners() {
        let texture = Texture::new("img");
        let coords = texture.resolve_coords((64, 32));
        assert_eq!(
            coords.as_ref(),
            &[
                Vec2::new(0.0, 0.0),
                Vec2::new(0.0, 31.0),
                Vec2::new(63.0, 31.0),
                Vec2::new(63.0, 0.0),
            ]
        );
    }
}
