//! Math utilities and types
//!
//! Type aliases over `nalgebra` plus the handful of helpers the hierarchy
//! needs when moving points and boxes between mesh-local spaces.

pub use nalgebra::{Matrix4, Quaternion, Unit, Vector2, Vector3};

/// 2D vector type (texture coordinates)
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Object placement used to derive the matrices passed to mesh-vs-mesh queries
///
/// The hierarchy itself always lives in mesh-local space; callers describe
/// where each mesh sits in the world with a `Transform` and hand the relative
/// matrix ([`Transform::relative_to`]) to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix (TRS order)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Matrix taking points from this object's local space into `target`'s local space
    ///
    /// This is the `geometry_to_bvh` matrix expected by the mesh-vs-mesh
    /// queries when `self` places the query mesh and `target` places the
    /// mesh owning the hierarchy. Returns `None` when `target` has a zero scale.
    pub fn relative_to(&self, target: &Self) -> Option<Mat4> {
        target
            .to_matrix()
            .try_inverse()
            .map(|inverse| inverse * self.to_matrix())
    }
}

/// Transform a position by an affine matrix
#[inline]
pub fn transform_point(matrix: &Mat4, point: &Vec3) -> Vec3 {
    matrix.transform_point(&Point3::from(*point)).coords
}

/// Transform a direction by an affine matrix (translation ignored)
#[inline]
pub fn transform_vector(matrix: &Mat4, vector: &Vec3) -> Vec3 {
    matrix.transform_vector(vector)
}

/// Index of the largest component (0 = x, 1 = y, 2 = z)
#[inline]
pub fn longest_axis(extent: &Vec3) -> usize {
    let mut axis = 0;
    if extent.y > extent[axis] {
        axis = 1;
    }
    if extent.z > extent[axis] {
        axis = 2;
    }
    axis
}

/// Math constants
pub mod constants {
    /// Tolerance used by the geometric predicates for near-zero lengths and denominators
    pub const EPSILON: f32 = 1e-10;

    /// Distance under which two features are considered touching
    pub const CONTACT_EPSILON: f32 = 1e-6;
}
