use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Errors from constructing a [`MatcapId`] out of untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("matcap {0} is outside the available set 1..=8")]
    OutOfRange(u32),
}

/// Identifier of one of the bundled matcap textures.
///
/// Always one of `1..=8`; the inner value is private so an out-of-range id
/// cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MatcapId(u8);

impl MatcapId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 8;

    /// Every selectable matcap, in display order.
    pub const ALL: [MatcapId; 8] = [
        MatcapId(1),
        MatcapId(2),
        MatcapId(3),
        MatcapId(4),
        MatcapId(5),
        MatcapId(6),
        MatcapId(7),
        MatcapId(8),
    ];

    pub fn new(index: u32) -> Result<Self, SelectionError> {
        if (Self::MIN as u32..=Self::MAX as u32).contains(&index) {
            Ok(Self(index as u8))
        } else {
            Err(SelectionError::OutOfRange(index))
        }
    }

    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// Path of the texture relative to the assets root.
    pub fn relative_path(self) -> String {
        format!("textures/matcaps/{}.png", self.0)
    }
}

impl Default for MatcapId {
    fn default() -> Self {
        Self(7)
    }
}

impl TryFrom<u32> for MatcapId {
    type Error = SelectionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MatcapId> for u32 {
    fn from(id: MatcapId) -> Self {
        id.index()
    }
}

impl std::str::FromStr for MatcapId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: u32 = s.trim().parse().map_err(|e| format!("{e}"))?;
        Self::new(n).map_err(|e| e.to_string())
    }
}

impl std::fmt::Display for MatcapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content identity of a decoded asset, derived from its source bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub u64);

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Spatial transform: position, Euler rotation (XYZ order, radians), scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matcap_id_bounds() {
        assert!(MatcapId::new(0).is_err());
        assert!(MatcapId::new(9).is_err());
        assert_eq!(MatcapId::new(1).unwrap().index(), 1);
        assert_eq!(MatcapId::new(8).unwrap().index(), 8);
        assert_eq!(MatcapId::new(42), Err(SelectionError::OutOfRange(42)));
    }

    #[test]
    fn matcap_default_is_seven() {
        assert_eq!(MatcapId::default().index(), 7);
        assert!(MatcapId::ALL.contains(&MatcapId::default()));
    }

    #[test]
    fn matcap_parse_and_path() {
        let id: MatcapId = "3".parse().unwrap();
        assert_eq!(id.relative_path(), "textures/matcaps/3.png");
        assert!("12".parse::<MatcapId>().is_err());
        assert!("abc".parse::<MatcapId>().is_err());
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Vec3::ZERO);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn transform_matrix_applies_translation() {
        let t = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            ..Transform::default()
        };
        assert_eq!(t.matrix().transform_point3(Vec3::ZERO), Vec3::new(1.0, 2.0, 3.0));
    }
}
