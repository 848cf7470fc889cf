/// Perspective, view and screen matrices, cached together
use crate::frame::Frame;
use crate::transform::{to_homogeneous, Mat4, Vec2, Vec3};

/// Clip planes and field of view for the perspective transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionConfig {
    pub near: f64,
    pub far: f64,
    /// Horizontal field of view in radians
    pub fov: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            near: 1.0,
            far: 100.0,
            fov: 60f64.to_radians(),
        }
    }
}

/// Matrix cache for one drawing surface and one camera.
///
/// `persview` is always `perspective · view`; every setter refreshes it
/// before returning.
#[derive(Debug, Clone)]
pub struct Projection {
    config: ProjectionConfig,
    width: u32,
    height: u32,
    perspective: Mat4,
    view: Mat4,
    persview: Mat4,
    screen: Mat4,
}

impl Projection {
    pub fn new(width: u32, height: u32, config: ProjectionConfig, camera: &Frame) -> Self {
        let perspective = Self::perspective_matrix(&config, Self::aspect_of(width, height));
        let view = Self::view_matrix(camera);
        Self {
            config,
            width,
            height,
            perspective,
            view,
            persview: perspective * view,
            screen: Self::screen_matrix(width, height),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Height over width, as the perspective transform expects it
    pub fn aspect(&self) -> f64 {
        Self::aspect_of(self.width, self.height)
    }

    pub fn perspective(&self) -> &Mat4 {
        &self.perspective
    }

    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    pub fn persview(&self) -> &Mat4 {
        &self.persview
    }

    pub fn screen(&self) -> &Mat4 {
        &self.screen
    }

    /// Rebuild everything that depends on the surface size
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.screen = Self::screen_matrix(width, height);
        self.perspective = Self::perspective_matrix(&self.config, self.aspect());
        self.persview = self.perspective * self.view;
    }

    pub fn set_config(&mut self, config: ProjectionConfig) {
        self.config = config;
        self.perspective = Self::perspective_matrix(&self.config, self.aspect());
        self.persview = self.perspective * self.view;
    }

    pub fn refresh_view(&mut self, camera: &Frame) {
        self.view = Self::view_matrix(camera);
        self.persview = self.perspective * self.view;
    }

    /// Project a world point to normalized device coordinates
    pub fn to_ndc(&self, point: &Vec3) -> Vec3 {
        let p = self.persview * to_homogeneous(point);
        Vec3::new(p.x / p.w, p.y / p.w, p.z / p.w)
    }

    /// Project a world point to integer pixel coordinates
    pub fn to_screen(&self, point: &Vec3) -> Vec2 {
        let p = self.persview * to_homogeneous(point);
        let s = self.screen * (p / p.w);
        Vec2::new(s.x.trunc(), s.y.trunc())
    }

    fn aspect_of(width: u32, height: u32) -> f64 {
        height as f64 / width as f64
    }

    /// Off-axis style frustum built from the field of view at unit distance
    pub fn perspective_matrix(config: &ProjectionConfig, aspect: f64) -> Mat4 {
        let (n, f) = (config.near, config.far);
        let w = 2.0 * (config.fov / 2.0).tan();
        let h = w * aspect;
        let (l, r) = (-w / 2.0, w / 2.0);
        let (b, t) = (-h / 2.0, h / 2.0);

        let mut m = Mat4::zeros();
        m[(0, 0)] = 2.0 * n / (r - l);
        m[(0, 2)] = (r + l) / (r - l);
        m[(1, 1)] = 2.0 * n / (t - b);
        m[(1, 2)] = (t + b) / (t - b);
        m[(2, 2)] = -(f + n) / (f - n);
        m[(2, 3)] = -2.0 * n * f / (f - n);
        m[(3, 2)] = -1.0;
        m
    }

    /// World-to-camera transform; the camera looks down its own -z
    pub fn view_matrix(camera: &Frame) -> Mat4 {
        let z = -camera.direction;
        let x = camera.upper.cross(&z);
        let y = z.cross(&x);
        let e = camera.center;

        let mut m = Mat4::zeros();
        for i in 0..3 {
            m[(0, i)] = x[i];
            m[(1, i)] = y[i];
            m[(2, i)] = z[i];
        }
        m[(0, 3)] = -e.dot(&x);
        m[(1, 3)] = -e.dot(&y);
        m[(2, 3)] = -e.dot(&z);
        m[(3, 3)] = 1.0;
        m
    }

    /// Maps NDC `[-1, 1]²` onto pixels with y growing downwards
    pub fn screen_matrix(width: u32, height: u32) -> Mat4 {
        let (w, h) = (width as f64, height as f64);
        let mut scale = Mat4::identity();
        scale[(0, 0)] = w / 2.0;
        scale[(1, 1)] = -h / 2.0;
        let mut offset = Mat4::identity();
        offset[(0, 3)] = w / 2.0;
        offset[(1, 3)] = h / 2.0;
        offset * scale
    }
}
