//! Cuboid collision-primitive geometry engine.
//!
//! A [`Block`] caches the 8 corner vertices for its size, computes the
//! inertia tensor of a hollow box, and answers nearest-feature queries
//! (corner / edge / face classification) for sphere-vs-box contact.
//!
//! Vertex arrays are deduplicated through a shared [`VertexCache`]: two
//! blocks of identical size hold the identical array. Entries live as
//! long as the cache itself.
//!
//! # Vertex indexing
//!
//! For half-extent `h`, vertex `i` is `(±h.x, ±h.y, ±h.z)` where bit 2
//! of `i` selects negative x, bit 1 negative y, bit 0 negative z.
//! `vertices[0] = +h` and `vertices[7] = -h` (the corner the cache is
//! keyed by).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use nalgebra::{Matrix3, Vector2, Vector3};

use crate::error::WorldError;
use crate::types::{GeoPairType, NormalId};
use crate::Result;

/// Face index → the 4 vertex indices of that face, in winding order.
const FACE_TO_VERTEX: [[usize; 4]; 6] = [
    [0, 2, 3, 1],
    [0, 1, 5, 4],
    [0, 4, 6, 2],
    [4, 5, 7, 6],
    [2, 6, 7, 3],
    [1, 3, 7, 5],
];

/// Face index × edge slot → edge id (0..12). Edge slot `k` runs between
/// the face's vertices `k` and `(k + 1) % 4`.
const FACE_VERTEX_TO_EDGE: [[usize; 4]; 6] = [
    [4, 11, 5, 8],
    [8, 3, 9, 0],
    [0, 7, 1, 4],
    [9, 6, 10, 7],
    [1, 10, 2, 11],
    [5, 2, 6, 3],
];

/// Cache key with a strict total order over 3-vectors: per-component
/// IEEE bit patterns compared lexicographically. Deterministic, so
/// equal corners always map to the same entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct CornerKey([u64; 3]);

impl CornerKey {
    fn from_corner(corner: &Vector3<f64>) -> Self {
        Self([corner.x.to_bits(), corner.y.to_bits(), corner.z.to_bits()])
    }
}

/// Shared, process-scoped deduplication cache of block vertex arrays.
///
/// Construct once and hand an `Arc<VertexCache>` to everything that
/// builds blocks. Entries are created on first miss and never evicted;
/// ownership of a vertex array is "longest holder among the cache and
/// all blocks sharing this corner value".
#[derive(Debug, Default)]
pub struct VertexCache {
    templates: Mutex<BTreeMap<CornerKey, Arc<[Vector3<f64>; 8]>>>,
}

impl VertexCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared 8-vertex array for a block whose most-negative corner
    /// is `corner`, creating and memoizing it on first miss.
    ///
    /// Equal corners always return the identical (pointer-equal) array.
    #[must_use]
    pub fn get_vertices(&self, corner: &Vector3<f64>) -> Arc<[Vector3<f64>; 8]> {
        let mut templates = self
            .templates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        templates
            .entry(CornerKey::from_corner(corner))
            .or_insert_with(|| Arc::new(template_vertices(corner)))
            .clone()
    }

    /// Number of distinct corner values cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build the 8 vertices for a box whose most-negative corner is
/// `corner` (so the half-extent is `-corner`).
fn template_vertices(corner: &Vector3<f64>) -> [Vector3<f64>; 8] {
    let mut vertices = [Vector3::zeros(); 8];
    for (i, vertex) in vertices.iter_mut().enumerate() {
        vertex.x = if i & 4 != 0 { corner.x } else { -corner.x };
        vertex.y = if i & 2 != 0 { corner.y } else { -corner.y };
        vertex.z = if i & 1 != 0 { corner.z } else { -corner.z };
    }
    vertices
}

/// Result of classifying a sphere-vs-box contact against a box feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BallBlockInfo {
    /// Contact against a face plane.
    Plane {
        /// Representative vertex of the face.
        offset: Vector3<f64>,
        /// Outward face normal.
        normal: NormalId,
    },
    /// Contact against an edge.
    Edge {
        /// Endpoint of the edge on the negative side of the free axis.
        offset: Vector3<f64>,
        /// Axis the edge runs along.
        axis: NormalId,
    },
    /// Contact against a corner vertex.
    Point {
        /// The corner vertex.
        offset: Vector3<f64>,
    },
}

impl BallBlockInfo {
    /// The contact-manifold pair type this feature implies.
    #[must_use]
    pub fn pair_type(&self) -> GeoPairType {
        match self {
            Self::Plane { .. } => GeoPairType::BallPlanePair,
            Self::Edge { .. } => GeoPairType::BallEdgePair,
            Self::Point { .. } => GeoPairType::BallPointPair,
        }
    }

    /// Representative vertex address of the feature.
    #[must_use]
    pub fn offset(&self) -> Vector3<f64> {
        match self {
            Self::Plane { offset, .. } | Self::Edge { offset, .. } | Self::Point { offset } => {
                *offset
            }
        }
    }
}

/// A cuboid collision primitive.
///
/// Holds the box size, the shared vertex array for that size, and the
/// derived bounding-sphere radius. All geometric queries work in body
/// coordinates centered on the box.
#[derive(Debug, Clone)]
pub struct Block {
    grid_size: Vector3<f64>,
    vertices: Arc<[Vector3<f64>; 8]>,
    corner_radius: f64,
}

impl Block {
    /// Create a block of the given full extents.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidGeometryQuery`] for a degenerate
    /// box (any extent not strictly positive or not finite).
    pub fn new(grid_size: Vector3<f64>, cache: &VertexCache) -> Result<Self> {
        if !grid_size.iter().all(|&extent| extent.is_finite() && extent > 0.0) {
            return Err(WorldError::invalid_geometry(format!(
                "degenerate box size {grid_size:?}"
            )));
        }
        let corner = grid_size * -0.5;
        let vertices = cache.get_vertices(&corner);
        let corner_radius = vertices[0].norm();
        Ok(Self {
            grid_size,
            vertices,
            corner_radius,
        })
    }

    /// Resize the block, refreshing the shared vertex array and the
    /// cached corner radius.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidGeometryQuery`] for a degenerate
    /// box.
    pub fn set_size(&mut self, grid_size: Vector3<f64>, cache: &VertexCache) -> Result<()> {
        *self = Self::new(grid_size, cache)?;
        Ok(())
    }

    /// Full extents of the box.
    #[must_use]
    pub fn grid_size(&self) -> Vector3<f64> {
        self.grid_size
    }

    /// The 8 shared corner vertices.
    #[must_use]
    pub fn vertices(&self) -> &[Vector3<f64>; 8] {
        &self.vertices
    }

    /// Bounding-sphere radius (magnitude of the first corner vertex).
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.corner_radius
    }

    /// Volume of the box.
    #[must_use]
    pub fn grid_volume(&self) -> f64 {
        self.grid_size.x * self.grid_size.y * self.grid_size.z
    }

    /// Inertia tensor for the given mass.
    ///
    /// Always delegates to the hollow-box formula; a solid-box moment
    /// is not implemented in this core.
    #[must_use]
    pub fn moment(&self, mass: f64) -> Matrix3<f64> {
        self.moment_hollow(mass)
    }

    /// Inertia tensor of a hollow box (six thin plates) of the given
    /// mass, about the center. Always diagonal.
    #[must_use]
    pub fn moment_hollow(&self, mass: f64) -> Matrix3<f64> {
        let third = 1.0 / 3.0;
        let x = self.grid_size.x;
        let y = self.grid_size.y;
        let z = self.grid_size.z;

        let surface_area = ((x + y) * z + x * y) * 2.0;
        let scale = mass / (2.0 * surface_area);

        // Per-axis moment for axis a with cross axes b, c.
        let axis_moment = |a: f64, b: f64, c: f64| {
            scale
                * ((b * b * b * c + b * c * c * c + a * c * c * c + a * b * b * b) * third
                    + a * b * b * c
                    + a * b * c * c)
        };

        Matrix3::from_diagonal(&Vector3::new(
            axis_moment(x, y, z),
            axis_moment(y, z, x),
            axis_moment(z, x, y),
        ))
    }

    /// Axis a cuboid edge runs along, for direct-face edge ids.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidGeometryQuery`] unless
    /// `12 <= edge_id < 36`.
    pub fn edge_normal(edge_id: usize) -> Result<NormalId> {
        if !(12..36).contains(&edge_id) {
            return Err(WorldError::invalid_geometry(format!(
                "edge id {edge_id} has no face normal"
            )));
        }
        NormalId::from_index((edge_id - 12) / 4)
            .ok_or_else(|| WorldError::invalid_geometry(format!("edge id {edge_id} out of range")))
    }

    /// Representative vertex of an edge id.
    ///
    /// `edge_id < 12` names one of the 12 cuboid edges and resolves
    /// through the face/edge tables; `12 <= edge_id < 36` addresses a
    /// face's vertex slot directly (`(edge_id - 12) / 4` is the face,
    /// `edge_id % 4` the slot).
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidGeometryQuery`] for edge ids `>= 36`.
    pub fn edge_vertex(&self, edge_id: usize) -> Result<Vector3<f64>> {
        if edge_id >= 12 {
            let face = Self::edge_normal(edge_id)?.index();
            return Ok(self.vertices[FACE_TO_VERTEX[face][edge_id % 4]]);
        }
        for face in 0..6 {
            for slot in 0..4 {
                if FACE_VERTEX_TO_EDGE[face][slot] == edge_id {
                    return Ok(self.vertices[FACE_TO_VERTEX[face][slot]]);
                }
            }
        }
        // The 6x4 table covers every id below 12 twice; unreachable for
        // valid input.
        Err(WorldError::invalid_geometry(format!(
            "edge id {edge_id} not in edge table"
        )))
    }

    /// Representative vertex and outward normal of the face a clip
    /// vector pins.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidGeometryQuery`] unless exactly one
    /// clip component is nonzero.
    pub fn plane_point(&self, clip: &Vector3<i32>) -> Result<(Vector3<f64>, NormalId)> {
        if nonzero_components(clip) != 1 {
            return Err(WorldError::invalid_geometry(format!(
                "plane query needs exactly one clipped axis, clip {clip:?}"
            )));
        }
        if clip.x != 0 {
            let normal = if clip.x > 0 { NormalId::X } else { NormalId::XNeg };
            Ok((self.vertices[4 * usize::from(clip.x <= 0)], normal))
        } else if clip.y != 0 {
            let normal = if clip.y > 0 { NormalId::Y } else { NormalId::YNeg };
            Ok((self.vertices[2 * usize::from(clip.y <= 0)], normal))
        } else {
            let normal = if clip.z > 0 { NormalId::Z } else { NormalId::ZNeg };
            Ok((self.vertices[usize::from(clip.z <= 0)], normal))
        }
    }

    /// Representative vertex of the edge a clip vector pins, plus the
    /// axis the edge runs along.
    ///
    /// The returned vertex is the edge endpoint on the negative side of
    /// the free axis.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidGeometryQuery`] unless exactly two
    /// clip components are nonzero.
    pub fn edge_point(&self, clip: &Vector3<i32>) -> Result<(Vector3<f64>, NormalId)> {
        if nonzero_components(clip) != 2 {
            return Err(WorldError::invalid_geometry(format!(
                "edge query needs exactly two clipped axes, clip {clip:?}"
            )));
        }
        if clip.x == 0 {
            let index = 4 + 2 * usize::from(clip.y <= 0) + usize::from(clip.z <= 0);
            Ok((self.vertices[index], NormalId::X))
        } else if clip.y == 0 {
            let index = 4 * usize::from(clip.x <= 0) + 2 + usize::from(clip.z <= 0);
            Ok((self.vertices[index], NormalId::Y))
        } else {
            let index = 4 * usize::from(clip.x <= 0) + 2 * usize::from(clip.y <= 0) + 1;
            Ok((self.vertices[index], NormalId::Z))
        }
    }

    /// The corner vertex a clip vector pins.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidGeometryQuery`] unless all three
    /// clip components are nonzero.
    pub fn corner_point(&self, clip: &Vector3<i32>) -> Result<Vector3<f64>> {
        if nonzero_components(clip) != 3 {
            return Err(WorldError::invalid_geometry(format!(
                "corner query needs all three axes clipped, clip {clip:?}"
            )));
        }
        let index = 4 * usize::from(clip.x <= 0)
            + 2 * usize::from(clip.y <= 0)
            + usize::from(clip.z <= 0);
        Ok(self.vertices[index])
    }

    /// Classify a sphere-vs-box contact by the number of clamped axes
    /// reported by [`Block::project_to_face`].
    ///
    /// One clamped axis means a face contact, two an edge contact,
    /// three a corner contact.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidGeometryQuery`] when `on_border`
    /// and `clip` disagree, or the point was not clamped at all.
    pub fn ball_block_info(&self, on_border: u32, clip: &Vector3<i32>) -> Result<BallBlockInfo> {
        match on_border {
            1 => {
                let (offset, normal) = self.plane_point(clip)?;
                Ok(BallBlockInfo::Plane { offset, normal })
            }
            2 => {
                let (offset, axis) = self.edge_point(clip)?;
                Ok(BallBlockInfo::Edge { offset, axis })
            }
            3 => {
                let offset = self.corner_point(clip)?;
                Ok(BallBlockInfo::Point { offset })
            }
            _ => Err(WorldError::invalid_geometry(format!(
                "ball-block query with {on_border} clamped axes"
            ))),
        }
    }

    /// Nearest face plane for a point known to be inside the box.
    ///
    /// Scans the six faces in X, Y, Z order, checking the negative
    /// normal after the positive one for each axis; ties keep the
    /// earlier face. The result is always a plane contact whose offset
    /// is a vertex lying on the chosen face (`vertices[0]` for positive
    /// normals, `vertices[7]` for negative ones).
    #[must_use]
    pub fn ball_inside_info(&self, ray: &Vector3<f64>) -> BallBlockInfo {
        let positive = self.vertices[0];
        let negative = self.vertices[7];

        let candidates = [
            (positive.x - ray.x, NormalId::X),
            (ray.x - negative.x, NormalId::XNeg),
            (positive.y - ray.y, NormalId::Y),
            (ray.y - negative.y, NormalId::YNeg),
            (positive.z - ray.z, NormalId::Z),
            (ray.z - negative.z, NormalId::ZNeg),
        ];

        let mut best = f64::INFINITY;
        let mut normal = NormalId::X;
        for (distance, id) in candidates {
            if distance < best {
                best = distance;
                normal = id;
            }
        }

        let offset = if normal.is_positive() { positive } else { negative };
        BallBlockInfo::Plane { offset, normal }
    }

    /// Clamp a point to the box extents, axis by axis.
    ///
    /// Returns the clip vector (±1 per clamped axis) and the number of
    /// axes clamped. Zero clamped axes means the point was already
    /// inside.
    pub fn project_to_face(&self, ray: &mut Vector3<f64>) -> (Vector3<i32>, u32) {
        let extent = self.vertices[0];
        let mut clip = Vector3::new(0, 0, 0);
        let mut on_border = 0;

        for axis in 0..3 {
            if ray[axis] > extent[axis] {
                ray[axis] = extent[axis];
                on_border += 1;
                clip[axis] = 1;
            }
            if -extent[axis] > ray[axis] {
                ray[axis] = -extent[axis];
                on_border += 1;
                clip[axis] = -1;
            }
        }
        (clip, on_border)
    }

    /// Project a vector onto the 2D plane of a face.
    ///
    /// Axis order and sign are chosen per face so that all six
    /// projections share one right-handed 2D convention (u × v points
    /// out of the face).
    #[must_use]
    pub fn projected_vertex(vertex: &Vector3<f64>, normal_id: NormalId) -> Vector2<f64> {
        match normal_id {
            NormalId::X => Vector2::new(vertex.y, vertex.z),
            NormalId::Y => Vector2::new(vertex.z, vertex.x),
            NormalId::Z => Vector2::new(vertex.x, vertex.y),
            NormalId::XNeg => Vector2::new(vertex.z, vertex.y),
            NormalId::YNeg => Vector2::new(vertex.x, vertex.z),
            NormalId::ZNeg => Vector2::new(vertex.y, vertex.x),
        }
    }

    /// Pick which of a face's four edges is closest to a world
    /// direction, returning its edge id.
    ///
    /// `rotation` is the body's world rotation; the direction is
    /// rotated into body space, projected onto the face, and the edge
    /// slot is chosen by sign tests on the projected coordinates.
    #[must_use]
    pub fn closest_edge(
        rotation: &Matrix3<f64>,
        normal_id: NormalId,
        cross_axis: &Vector3<f64>,
    ) -> usize {
        let axis_in_body = rotation.transpose() * cross_axis;
        let projected = Self::projected_vertex(&axis_in_body, normal_id);

        let slot = if projected.x <= 0.0 {
            if projected.y <= 0.0 {
                2
            } else {
                3
            }
        } else if projected.y <= 0.0 {
            1
        } else {
            0
        };
        FACE_VERTEX_TO_EDGE[normal_id.index()][slot]
    }
}

fn nonzero_components(clip: &Vector3<i32>) -> usize {
    clip.iter().filter(|&&component| component != 0).count()
}
