//! Indexed triangle meshes
//!
//! [`MeshGeometry`] is the vertex/index container the hierarchy is built over:
//! positions plus an optional index buffer, optional per-vertex normals and
//! texture coordinates, and optional groups (contiguous triangle ranges, for
//! example one per material).

pub mod shapes;

use serde::{Deserialize, Serialize};

use crate::foundation::math::{transform_point, Mat4, Vec2, Vec3};
use crate::geometry::{ExtendedTriangle, AABB};

/// Largest vertex count addressed with 16-bit indices
pub const MAX_U16_VERTICES: usize = u16::MAX as usize;

/// Mesh validation errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// No position data
    #[error("Geometry has no positions")]
    MissingPositions,

    /// Non-indexed positions must come in whole triangles
    #[error("Position count {0} is not a multiple of 3")]
    PositionCount(usize),

    /// Index buffers must come in whole triangles
    #[error("Index count {0} is not a multiple of 3")]
    IndexCount(usize),

    /// An index refers past the end of the position list
    #[error("Index {index} out of bounds for {vertex_count} vertices")]
    IndexOutOfBounds {
        /// The offending index value
        index: u32,
        /// Number of positions
        vertex_count: usize,
    },

    /// A per-vertex attribute does not match the position count
    #[error("Attribute `{attribute}` has {actual} entries, expected {expected}")]
    AttributeCount {
        /// Attribute name
        attribute: &'static str,
        /// Number of positions
        expected: usize,
        /// Number of attribute entries
        actual: usize,
    },
}

/// A contiguous run of triangles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriangleRange {
    /// First triangle
    pub offset: u32,
    /// Number of triangles
    pub count: u32,
}

impl TriangleRange {
    /// Creates a range
    pub fn new(offset: u32, count: u32) -> Self {
        Self { offset, count }
    }

    /// One past the last triangle
    pub fn end(&self) -> u32 {
        self.offset.saturating_add(self.count)
    }
}

/// Triangle vertex indices at 16 or 32 bits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexBuffer {
    /// 16-bit indices
    U16(Vec<u16>),
    /// 32-bit indices
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// Pick the narrowest width able to address `vertex_count` vertices
    ///
    /// Indices that do not fit in 16 bits keep the 32-bit buffer so
    /// validation still sees their real values.
    pub fn for_vertex_count(indices: Vec<u32>, vertex_count: usize) -> Self {
        if vertex_count > MAX_U16_VERTICES {
            return Self::U32(indices);
        }
        match indices.iter().map(|&i| u16::try_from(i)).collect::<Result<Vec<u16>, _>>() {
            Ok(narrow) => Self::U16(narrow),
            Err(_) => Self::U32(indices),
        }
    }

    /// `0, 1, 2, ..` over every vertex
    pub fn sequential(vertex_count: usize) -> Self {
        Self::for_vertex_count((0..vertex_count as u32).collect(), vertex_count)
    }

    /// Number of indices
    pub fn len(&self) -> usize {
        match self {
            Self::U16(values) => values.len(),
            Self::U32(values) => values.len(),
        }
    }

    /// True when there are no indices
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index value at `i`
    #[inline]
    pub fn get(&self, i: usize) -> u32 {
        match self {
            Self::U16(values) => u32::from(values[i]),
            Self::U32(values) => values[i],
        }
    }

    /// All indices widened to 32 bits
    pub fn to_u32_vec(&self) -> Vec<u32> {
        match self {
            Self::U16(values) => values.iter().copied().map(u32::from).collect(),
            Self::U32(values) => values.clone(),
        }
    }

    /// Exchange the index triples of triangles `a` and `b`
    pub(crate) fn swap_triangles(&mut self, a: usize, b: usize) {
        match self {
            Self::U16(values) => swap_triples(values, a, b),
            Self::U32(values) => swap_triples(values, a, b),
        }
    }
}

fn swap_triples<T>(values: &mut [T], a: usize, b: usize) {
    for k in 0..3 {
        values.swap(3 * a + k, 3 * b + k);
    }
}

/// Triangle mesh: positions, optional index and attributes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshGeometry {
    positions: Vec<Vec3>,
    index: Option<IndexBuffer>,
    normals: Option<Vec<Vec3>>,
    uvs: Option<Vec<Vec2>>,
    groups: Vec<TriangleRange>,
}

impl MeshGeometry {
    /// Creates an indexed mesh from MODEL SPACE vertices and indices
    ///
    /// The index width is chosen from the vertex count.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Result<Self, GeometryError> {
        let index = IndexBuffer::for_vertex_count(indices, positions.len());
        Self::with_index_buffer(positions, index)
    }

    /// Creates an indexed mesh with an explicit index buffer
    pub fn with_index_buffer(positions: Vec<Vec3>, index: IndexBuffer) -> Result<Self, GeometryError> {
        let geometry = Self {
            positions,
            index: Some(index),
            ..Default::default()
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Creates a mesh where every three consecutive positions form a triangle
    pub fn non_indexed(positions: Vec<Vec3>) -> Result<Self, GeometryError> {
        let geometry = Self {
            positions,
            ..Default::default()
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Attach per-vertex normals
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Result<Self, GeometryError> {
        check_attribute("normal", self.positions.len(), normals.len())?;
        self.normals = Some(normals);
        Ok(self)
    }

    /// Attach per-vertex texture coordinates
    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Result<Self, GeometryError> {
        check_attribute("uv", self.positions.len(), uvs.len())?;
        self.uvs = Some(uvs);
        Ok(self)
    }

    /// Replace the triangle groups
    pub fn with_groups(mut self, groups: Vec<TriangleRange>) -> Self {
        self.groups = groups;
        self
    }

    /// Check the structural rules: positions present, whole triangles, indices in range
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.positions.is_empty() {
            return Err(GeometryError::MissingPositions);
        }

        let vertex_count = self.positions.len();
        match &self.index {
            Some(index) => {
                if index.len() % 3 != 0 {
                    return Err(GeometryError::IndexCount(index.len()));
                }
                if let Some(bad) = (0..index.len()).map(|i| index.get(i)).find(|&i| i as usize >= vertex_count) {
                    return Err(GeometryError::IndexOutOfBounds {
                        index: bad,
                        vertex_count,
                    });
                }
            }
            None if vertex_count % 3 != 0 => return Err(GeometryError::PositionCount(vertex_count)),
            None => {}
        }

        if let Some(normals) = &self.normals {
            check_attribute("normal", vertex_count, normals.len())?;
        }
        if let Some(uvs) = &self.uvs {
            check_attribute("uv", vertex_count, uvs.len())?;
        }
        Ok(())
    }

    /// Vertex positions
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Mutable vertex positions, for deforming the mesh before a refit
    pub fn positions_mut(&mut self) -> &mut [Vec3] {
        &mut self.positions
    }

    /// Per-vertex normals, if present
    pub fn normals(&self) -> Option<&[Vec3]> {
        self.normals.as_deref()
    }

    /// Per-vertex texture coordinates, if present
    pub fn uvs(&self) -> Option<&[Vec2]> {
        self.uvs.as_deref()
    }

    /// Triangle groups
    pub fn groups(&self) -> &[TriangleRange] {
        &self.groups
    }

    /// Index buffer, if present
    pub fn index(&self) -> Option<&IndexBuffer> {
        self.index.as_ref()
    }

    pub(crate) fn index_mut(&mut self) -> Option<&mut IndexBuffer> {
        self.index.as_mut()
    }

    /// Replace the index buffer after validating it against the positions
    pub fn set_index(&mut self, index: Option<IndexBuffer>) -> Result<(), GeometryError> {
        let previous = std::mem::replace(&mut self.index, index);
        if let Err(err) = self.validate() {
            self.index = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Give a non-indexed mesh a sequential index; returns true if one was created
    pub fn ensure_index(&mut self) -> bool {
        if self.index.is_some() {
            return false;
        }
        self.index = Some(IndexBuffer::sequential(self.positions.len()));
        true
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        match &self.index {
            Some(index) => index.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    /// Vertex indices of triangle `triangle`
    #[inline]
    pub fn triangle_indices(&self, triangle: usize) -> [u32; 3] {
        let base = 3 * triangle;
        match &self.index {
            Some(index) => [index.get(base), index.get(base + 1), index.get(base + 2)],
            None => [base as u32, base as u32 + 1, base as u32 + 2],
        }
    }

    /// Vertex positions of triangle `triangle`
    #[inline]
    pub fn triangle_vertices(&self, triangle: usize) -> [Vec3; 3] {
        self.triangle_indices(triangle).map(|i| self.positions[i as usize])
    }

    /// Triangle `triangle` with its cached test data
    pub fn triangle(&self, triangle: usize) -> ExtendedTriangle {
        ExtendedTriangle::from_vertices(self.triangle_vertices(triangle))
    }

    /// Every triangle moved by `matrix`
    pub fn transformed_triangles(&self, matrix: &Mat4) -> Vec<ExtendedTriangle> {
        (0..self.triangle_count())
            .map(|triangle| {
                let vertices = self.triangle_vertices(triangle);
                ExtendedTriangle::from_vertices(vertices.map(|v| transform_point(matrix, &v)))
            })
            .collect()
    }

    /// Bounds of every position
    pub fn bounding_box(&self) -> AABB {
        AABB::from_points(self.positions.iter())
    }

    /// Normalized vertex normal at a barycentric location
    pub fn interpolate_normal(&self, triangle: usize, barycentric: &Vec3) -> Option<Vec3> {
        let normals = self.normals.as_ref()?;
        let [i, j, k] = self.triangle_indices(triangle);
        let normal = normals[i as usize] * barycentric.x
            + normals[j as usize] * barycentric.y
            + normals[k as usize] * barycentric.z;
        normal.try_normalize(f32::EPSILON)
    }

    /// Texture coordinate at a barycentric location
    pub fn interpolate_uv(&self, triangle: usize, barycentric: &Vec3) -> Option<Vec2> {
        let uvs = self.uvs.as_ref()?;
        let [i, j, k] = self.triangle_indices(triangle);
        Some(uvs[i as usize] * barycentric.x + uvs[j as usize] * barycentric.y + uvs[k as usize] * barycentric.z)
    }
}

fn check_attribute(attribute: &'static str, expected: usize, actual: usize) -> Result<(), GeometryError> {
    if expected == actual {
        Ok(())
    } else {
        Err(GeometryError::AttributeCount {
            attribute,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_positions() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(MeshGeometry::non_indexed(vec![]), Err(GeometryError::MissingPositions));
        assert_eq!(
            MeshGeometry::non_indexed(quad_positions()),
            Err(GeometryError::PositionCount(4))
        );
        assert_eq!(
            MeshGeometry::new(quad_positions(), vec![0, 1, 2, 0]),
            Err(GeometryError::IndexCount(4))
        );
        assert_eq!(
            MeshGeometry::new(quad_positions(), vec![0, 1, 4]),
            Err(GeometryError::IndexOutOfBounds { index: 4, vertex_count: 4 })
        );
        // Would wrap to 2 if narrowed to 16 bits
        assert_eq!(
            MeshGeometry::new(quad_positions(), vec![0, 1, 65_538]),
            Err(GeometryError::IndexOutOfBounds { index: 65_538, vertex_count: 4 })
        );

        let mesh = MeshGeometry::new(quad_positions(), vec![0, 1, 2, 0, 2, 3]).unwrap();
        assert!(matches!(
            mesh.with_normals(vec![Vec3::z(); 3]),
            Err(GeometryError::AttributeCount { attribute: "normal", expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_index_width_follows_vertex_count() {
        let mesh = MeshGeometry::new(quad_positions(), vec![0, 1, 2, 0, 2, 3]).unwrap();
        assert!(matches!(mesh.index(), Some(IndexBuffer::U16(_))));

        let many = vec![Vec3::zeros(); MAX_U16_VERTICES + 3];
        let mut big = MeshGeometry::non_indexed(many).unwrap();
        assert!(big.ensure_index());
        assert!(matches!(big.index(), Some(IndexBuffer::U32(_))));
        assert!(!big.ensure_index());
    }

    #[test]
    fn test_triangle_access() {
        let mut mesh = MeshGeometry::new(quad_positions(), vec![0, 1, 2, 0, 2, 3]).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.triangle_indices(1), [0, 2, 3]);
        assert_eq!(mesh.triangle_vertices(1)[2], Vec3::new(0.0, 1.0, 0.0));

        mesh.index_mut().unwrap().swap_triangles(0, 1);
        assert_eq!(mesh.triangle_indices(0), [0, 2, 3]);
        assert_eq!(mesh.triangle_indices(1), [0, 1, 2]);
    }

    #[test]
    fn test_set_index_rejects_and_restores() {
        let mut mesh = MeshGeometry::new(quad_positions(), vec![0, 1, 2]).unwrap();
        let bad = IndexBuffer::U32(vec![0, 1, 9]);
        assert!(mesh.set_index(Some(bad)).is_err());
        assert_eq!(mesh.index().unwrap().to_u32_vec(), vec![0, 1, 2]);
    }

    #[test]
    fn test_interpolated_attributes() {
        let mesh = MeshGeometry::new(quad_positions(), vec![0, 1, 2])
            .unwrap()
            .with_normals(vec![Vec3::z(); 4])
            .unwrap()
            .with_uvs(vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ])
            .unwrap();
        let bary = Vec3::new(0.5, 0.25, 0.25);
        assert_eq!(mesh.interpolate_normal(0, &bary), Some(Vec3::z()));
        let uv = mesh.interpolate_uv(0, &bary).unwrap();
        assert!((uv - Vec2::new(0.5, 0.25)).magnitude() < 1e-6);
    }
}
