/// K3D Core Library - software 3D scene engine for 2D surfaces
///
/// This library holds everything that does not depend on a particular host:
/// vector math, the object/camera model, animation, lighting and the
/// painter's-algorithm renderer. Hosts supply a [`DrawingSurface`] and call
/// [`Scene::tick`] once per frame.

pub mod animation;
pub mod camera;
pub mod frame;
pub mod geometry;
pub mod light;
pub mod object;
pub mod projection;
pub mod scene;
pub mod shapes;
pub mod surface;
pub mod timing;
pub mod transform;

// Re-export commonly used types
pub use animation::{Action, AnimationPattern};
pub use camera::{Camera, Tracking};
pub use frame::Frame;
pub use geometry::{Polygon, Texture};
pub use light::Light;
pub use object::{Object, ShapeKind};
pub use projection::{Projection, ProjectionConfig};
pub use scene::{CameraMut, ObjectId, Scene, SceneConfig};
pub use shapes::{Billboard, GateProbe, NeedleParams};
pub use surface::{DrawingSurface, ImageProvider, Rgba};
pub use timing::{Clock, ManualClock, SystemClock};
pub use transform::{Transform, Vec2, Vec3};
