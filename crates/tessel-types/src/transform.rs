use serde::{Deserialize, Serialize};

/// Spatial transform of a node.
///
/// Rotation is a unit quaternion in `[x, y, z, w]` order. Components omitted
/// on the wire default to the identity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default = "Transform::zero_position")]
    pub position: [f64; 3],
    #[serde(default = "Transform::identity_rotation")]
    pub rotation: [f64; 4],
    #[serde(default = "Transform::unit_scale")]
    pub scale: [f64; 3],
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0, 1.0, 1.0],
    };

    /// The identity transform: zero position, identity rotation, unit scale.
    pub fn identity() -> Self {
        Self::IDENTITY
    }

    /// A pure translation.
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: [x, y, z],
            ..Self::IDENTITY
        }
    }

    pub fn has_zero_position(&self) -> bool {
        self.position == Self::IDENTITY.position
    }

    pub fn has_identity_rotation(&self) -> bool {
        self.rotation == Self::IDENTITY.rotation
    }

    pub fn has_unit_scale(&self) -> bool {
        self.scale == Self::IDENTITY.scale
    }

    /// Exact comparison against the identity; no epsilon.
    pub fn is_identity(&self) -> bool {
        self.has_zero_position() && self.has_identity_rotation() && self.has_unit_scale()
    }

    fn zero_position() -> [f64; 3] {
        Self::IDENTITY.position
    }

    fn identity_rotation() -> [f64; 4] {
        Self::IDENTITY.rotation
    }

    fn unit_scale() -> [f64; 3] {
        Self::IDENTITY.scale
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
