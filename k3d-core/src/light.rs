/// Directional light with an ambient term
use crate::transform::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// RGB, each component in `[0, 255]`
    pub color: Vec3,
    /// Unit direction of incidence
    pub direction: Vec3,
    pub ambient: f64,
    /// `ambient + diffuse` should be 1; this is not enforced
    pub diffuse: f64,
}

impl Light {
    /// Build a light; `direction` is normalized here
    pub fn new(color: Vec3, direction: Vec3, ambient: f64, diffuse: f64) -> Self {
        Self {
            color,
            direction: direction.normalize(),
            ambient,
            diffuse,
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::new(
            Vec3::new(255.0, 255.0, 255.0),
            Vec3::new(0.0, 0.0, 1.0),
            0.2,
            0.8,
        )
    }
}
