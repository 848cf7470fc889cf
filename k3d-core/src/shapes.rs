/// Factories for the basic objects: rectangle, cube and needle
use nalgebra::Matrix3;

use crate::frame::Frame;
use crate::geometry::Polygon;
use crate::object::{Object, ShapeKind};
use crate::transform::Vec3;

/// How a billboard rectangle turns toward the camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Billboard {
    /// Face the camera freely (spheres, particles)
    Free,
    /// Only spin about this unit axis (trees, posts)
    FixedAxis(Vec3),
}

/// A flat object made of a single polygon.
///
/// Billboards ignore lighting and re-orient every frame before drawing.
pub fn rectangle(mut polygon: Polygon, billboard: Option<Billboard>) -> Object {
    if billboard.is_some() {
        polygon.no_light = true;
    }
    let mut rect = Object::with_frame(Frame {
        center: polygon.center(),
        ..Frame::default()
    });
    rect.add_polygon(polygon);
    if let Some(billboard) = billboard {
        rect.set_kind(ShapeKind::Billboard(billboard));
    }
    rect
}

/// An axis-aligned cube centered at the origin with half-extent 1
pub fn cube() -> Object {
    let mut cube = Object::new();

    let v0 = Vec3::new(-1.0, 1.0, -1.0);
    let corner = |x: f64, y: f64, z: f64| v0.component_mul(&Vec3::new(x, y, z));
    let v = [
        v0,
        corner(1.0, 1.0, -1.0),
        corner(-1.0, 1.0, -1.0),
        corner(-1.0, 1.0, 1.0),
        corner(1.0, -1.0, 1.0),
        corner(1.0, -1.0, -1.0),
        corner(-1.0, -1.0, -1.0),
        corner(-1.0, -1.0, 1.0),
    ];

    for face in [
        [0, 1, 2, 3],
        [1, 5, 6, 2],
        [2, 6, 7, 3],
        [3, 7, 4, 0],
        [0, 4, 5, 1],
        [6, 5, 4, 7],
    ] {
        cube.add_polygon(Polygon::new(face.iter().map(|&i| v[i]).collect()));
    }
    cube
}

/// Dimensions of a needle: an upright hollow frame with an eye near the top
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeedleParams {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    pub inner_width: f64,
    pub inner_height: f64,
    /// Distance from the top of the needle to the top of the eye
    pub margin_top: f64,
}

/// Outcome of a point-in-needle test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateProbe {
    pub inside_outer: bool,
    pub inside_inner: bool,
}

impl GateProbe {
    /// Inside the solid frame rather than the eye
    pub fn is_hit(&self) -> bool {
        self.inside_outer && !self.inside_inner
    }

    pub fn is_pass(&self) -> bool {
        self.inside_inner
    }
}

/// Box test state kept on needle objects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeedleGate {
    params: NeedleParams,
}

impl NeedleGate {
    pub fn params(&self) -> &NeedleParams {
        &self.params
    }

    /// Express `point` in the needle's own axes and test both boxes.
    ///
    /// The needle's center sits at its top face, so heights inside it are
    /// negative.
    pub fn probe(&self, frame: &Frame, point: &Vec3) -> GateProbe {
        let to_local = Matrix3::from_rows(&[
            frame.left().transpose(),
            frame.upper.transpose(),
            frame.direction.transpose(),
        ]);
        let local = to_local * (point - frame.center);
        let p = &self.params;

        let inside_outer = local.x.abs() < p.width / 2.0
            && -p.height < local.y
            && local.y < 0.0
            && local.z.abs() < p.depth / 2.0;
        let inside_inner = local.x.abs() < p.inner_width / 2.0
            && -p.margin_top - p.inner_height < local.y
            && local.y < -p.margin_top
            && local.z.abs() < p.depth / 2.0;

        GateProbe {
            inside_outer,
            inside_inner,
        }
    }
}

/// A needle standing on the origin, its center at the top face.
pub fn needle(params: NeedleParams) -> Object {
    let NeedleParams {
        width,
        height,
        depth,
        inner_width,
        inner_height,
        margin_top,
    } = params;
    let (hw, hd, hiw) = (width / 2.0, depth / 2.0, inner_width / 2.0);
    let eye_top = height - margin_top;
    let eye_bottom = eye_top - inner_height;

    let mut needle = Object::with_frame(Frame {
        center: Vec3::new(0.0, height, 0.0),
        ..Frame::default()
    });

    let v = [
        // outer box
        Vec3::new(hw, 0.0, hd),
        Vec3::new(hw, 0.0, -hd),
        Vec3::new(-hw, 0.0, -hd),
        Vec3::new(-hw, 0.0, hd),
        Vec3::new(hw, height, hd),
        Vec3::new(hw, height, -hd),
        Vec3::new(-hw, height, -hd),
        Vec3::new(-hw, height, hd),
        // front face around the eye
        Vec3::new(-hw, eye_top, hd),
        Vec3::new(-hiw, eye_top, hd),
        Vec3::new(hiw, eye_top, hd),
        Vec3::new(hw, eye_top, hd),
        Vec3::new(-hw, eye_bottom, hd),
        Vec3::new(-hiw, eye_bottom, hd),
        Vec3::new(hiw, eye_bottom, hd),
        Vec3::new(hw, eye_bottom, hd),
        // back face around the eye
        Vec3::new(hw, eye_top, -hd),
        Vec3::new(hiw, eye_top, -hd),
        Vec3::new(-hiw, eye_top, -hd),
        Vec3::new(-hw, eye_top, -hd),
        Vec3::new(hw, eye_bottom, -hd),
        Vec3::new(hiw, eye_bottom, -hd),
        Vec3::new(-hiw, eye_bottom, -hd),
        Vec3::new(-hw, eye_bottom, -hd),
    ];

    const FACES: [[usize; 4]; 16] = [
        // bottom, sides, top
        [0, 1, 2, 3],
        [4, 0, 1, 5],
        [6, 2, 3, 7],
        [6, 7, 4, 5],
        // front
        [7, 8, 11, 4],
        [8, 12, 13, 9],
        [10, 14, 15, 11],
        [12, 3, 0, 15],
        // back
        [5, 16, 19, 6],
        [16, 20, 21, 17],
        [18, 22, 23, 19],
        [20, 1, 2, 23],
        // inside of the eye
        [9, 13, 22, 18],
        [13, 14, 21, 22],
        [14, 10, 17, 21],
        [10, 9, 18, 17],
    ];
    for face in FACES {
        needle.add_polygon(Polygon::new(face.iter().map(|&i| v[i]).collect()));
    }

    needle.set_kind(ShapeKind::Needle(NeedleGate { params }));
    needle
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course_needle() -> Object {
        needle(NeedleParams {
            width: 1.0,
            height: 20.0,
            depth: 1.0,
            inner_width: 0.8,
            inner_height: 1.6,
            margin_top: 0.2,
        })
    }

    #[test]
    fn test_cube_faces_point_outwards() {
        let cube = cube();
        assert_eq!(cube.polygons().len(), 6);
        for polygon in cube.polygons() {
            let outward = polygon.center().normalize();
            assert!((polygon.normal() - outward).norm() < 1e-12);
        }
        assert!((cube.size() - 3f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_rectangle_centers_on_polygon() {
        let rect = rectangle(
            Polygon::new(vec![
                Vec3::new(2.0, 1.0, 5.0),
                Vec3::new(2.0, -1.0, 5.0),
                Vec3::new(6.0, -1.0, 5.0),
                Vec3::new(6.0, 1.0, 5.0),
            ]),
            None,
        );
        assert_eq!(rect.center(), Vec3::new(4.0, 0.0, 5.0));
        assert!((rect.size() - 5f64.sqrt()).abs() < 1e-12);
        assert_eq!(rect.kind(), &ShapeKind::Plain);
        assert!(!rect.polygons()[0].no_light);
    }

    #[test]
    fn test_billboard_rectangle_is_unlit() {
        let rect = rectangle(
            Polygon::new(vec![
                Vec3::new(-1.0, 1.0, 0.0),
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
            ]),
            Some(Billboard::Free),
        );
        assert!(rect.polygons()[0].no_light);
        assert_eq!(rect.kind(), &ShapeKind::Billboard(Billboard::Free));
    }

    #[test]
    fn test_needle_sweep_through_eye() {
        let needle = course_needle();
        assert_eq!(needle.polygons().len(), 16);

        let mut passed = false;
        for step in 0..=16 {
            let z = -2.0 + step as f64 * 0.25;
            let probe = needle.probe(&Vec3::new(0.0, 19.0, z)).unwrap();
            assert!(!probe.is_hit());
            if z.abs() < 0.5 {
                assert_eq!(probe, GateProbe { inside_outer: true, inside_inner: true });
                passed = true;
            } else {
                assert_eq!(probe, GateProbe { inside_outer: false, inside_inner: false });
            }
        }
        assert!(passed);
    }

    #[test]
    fn test_needle_sweep_into_frame() {
        let needle = course_needle();
        let probe = needle.probe(&Vec3::new(0.45, 19.0, 0.0)).unwrap();
        assert_eq!(probe, GateProbe { inside_outer: true, inside_inner: false });
        assert!(probe.is_hit());

        // Below the eye is solid too.
        let probe = needle.probe(&Vec3::new(0.0, 10.0, 0.0)).unwrap();
        assert!(probe.is_hit());
    }

    #[test]
    fn test_needle_probe_follows_motion() {
        let mut needle = course_needle();
        needle.move_to(&Vec3::new(5.0, -2.0, 20.0));
        needle.rotate_yaw(std::f64::consts::FRAC_PI_2);

        // The eye's width now runs along world z.
        let eye = Vec3::new(5.45, -3.0, 20.0);
        assert!(needle.probe(&eye).unwrap().is_pass());
        let frame = Vec3::new(5.0, -3.0, 20.45);
        assert!(needle.probe(&frame).unwrap().is_hit());
    }

    #[test]
    fn test_probe_on_plain_object() {
        assert!(cube().probe(&Vec3::zeros()).is_none());
    }
}
