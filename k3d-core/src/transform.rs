/// Linear algebra helpers shared by the whole engine
use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

pub type Vec2 = Vector2<f64>;
pub type Vec3 = Vector3<f64>;
pub type Vec4 = Vector4<f64>;
pub type Mat3 = Matrix3<f64>;
pub type Mat4 = Matrix4<f64>;

/// The world "up" axis used for roll correction
pub fn world_up() -> Vec3 {
    Vec3::new(0.0, 1.0, 0.0)
}

/// Angle between two vectors in radians.
///
/// The cosine is clamped into `[-1, 1]` before `acos` so rounding error never
/// produces NaN. A NaN cosine (zero-length input) collapses to an angle of 0.
pub fn angle_between(a: &Vec3, b: &Vec3) -> f64 {
    let cos = a.dot(b) / (a.norm() * b.norm());
    cos.min(1.0).max(-1.0).acos()
}

/// Append a trailing 1 to a 3D point
pub fn to_homogeneous(v: &Vec3) -> Vec4 {
    Vec4::new(v.x, v.y, v.z, 1.0)
}

/// Drop the fourth component of a homogeneous vector
pub fn from_homogeneous(v: &Vec4) -> Vec3 {
    v.xyz()
}

/// Transform builder for rotations and texture mappings
pub struct Transform;

impl Transform {
    /// Rodrigues rotation about a unit `axis`:
    /// `R = a·aᵀ + (I − a·aᵀ)·cos θ − [a]ₓ·sin θ`.
    ///
    /// The axis is always a fixed point of the returned matrix.
    pub fn rotation_matrix(axis: &Vec3, angle: f64) -> Mat3 {
        let outer = axis * axis.transpose();
        let skew = axis.cross_matrix();
        outer + (Mat3::identity() - outer) * angle.cos() - skew * angle.sin()
    }

    /// Affine map (homogeneous 3x3) taking triangle `src` onto triangle `dst`.
    ///
    /// Vertex 0 anchors the translation, the two edges from it define the
    /// linear part. A degenerate `src` divides by zero and yields non-finite
    /// entries; callers must not pass collinear triangles.
    pub fn affine_matrix(src: [Vec2; 3], dst: [Vec2; 3]) -> Mat3 {
        let (s1, s2) = (src[1] - src[0], src[2] - src[0]);
        let (d1, d2) = (dst[1] - dst[0], dst[2] - dst[0]);
        let area = s1.x * s2.y - s2.x * s1.y;

        let mut m = Mat3::zeros();
        m[(0, 0)] = (d1.x * s2.y - d2.x * s1.y) / area;
        m[(0, 1)] = (s1.x * d2.x - d1.x * s2.x) / area;
        m[(1, 0)] = (d1.y * s2.y - s1.y * d2.y) / area;
        m[(1, 1)] = (s1.x * d2.y - s2.x * d1.y) / area;

        let linear = m.fixed_view::<2, 2>(0, 0).into_owned();
        let offset = dst[0] - linear * src[0];
        m[(0, 2)] = offset.x;
        m[(1, 2)] = offset.y;
        m[(2, 2)] = 1.0;
        m
    }

    /// Apply a homogeneous 2D affine matrix to a point
    pub fn apply_affine(m: &Mat3, p: &Vec2) -> Vec2 {
        let h = m * nalgebra::Vector3::new(p.x, p.y, 1.0);
        Vec2::new(h.x, h.y)
    }
}
