//! Hexagonal grid primitives (H3).

use std::fmt;

use geo_types::Point;
use h3o::{CellIndex, LatLng, Resolution};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{HeatmapError, HeatmapResult};

/// Resolution of the ancestor cell used for shard placement.
pub const SHARD_RESOLUTION: Resolution = Resolution::Three;

/// Bits 36..51 of an H3 index hold the base cell and the first three
/// digits, which together identify the resolution-3 ancestor.
const SHARD_KEY_SHIFT: u32 = 36;
const SHARD_KEY_MASK: u64 = 0xFFFF;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum GridResolution {
    Eight,
    Nine,
    Ten,
}

impl GridResolution {
    pub const ALLOWED: [u8; 3] = [8, 9, 10];

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Eight => 8,
            Self::Nine => 9,
            Self::Ten => 10,
        }
    }

    fn to_h3(self) -> Resolution {
        match self {
            Self::Eight => Resolution::Eight,
            Self::Nine => Resolution::Nine,
            Self::Ten => Resolution::Ten,
        }
    }
}

impl TryFrom<u8> for GridResolution {
    type Error = HeatmapError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            8 => Ok(Self::Eight),
            9 => Ok(Self::Nine),
            10 => Ok(Self::Ten),
            other => Err(HeatmapError::invalid_resolution(other)),
        }
    }
}

impl fmt::Display for GridResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl Serialize for GridResolution {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for GridResolution {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        GridResolution::try_from(value).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct GridCell(CellIndex);

impl GridCell {
    /// Cell containing `point` (x = longitude, y = latitude).
    pub fn for_point(point: Point<f64>, resolution: GridResolution) -> HeatmapResult<Self> {
        let latlng = LatLng::new(point.y(), point.x()).map_err(|err| {
            HeatmapError::geometry(format!(
                "point ({}, {}) is not a valid coordinate: {err}",
                point.x(),
                point.y()
            ))
        })?;
        Ok(Self(latlng.to_cell(resolution.to_h3())))
    }

    pub fn from_i64(value: i64) -> HeatmapResult<Self> {
        CellIndex::try_from(value as u64)
            .map(Self)
            .map_err(|err| HeatmapError::geometry(format!("invalid grid cell {value}: {err}")))
    }

    /// Storage form; H3 indexes never set the top bit, so this is lossless.
    pub fn as_i64(self) -> i64 {
        u64::from(self.0) as i64
    }

    pub fn resolution(self) -> u8 {
        u8::from(self.0.resolution())
    }

    pub fn cell_index(self) -> CellIndex {
        self.0
    }

    /// Short integer encoding of the resolution-3 ancestor.
    ///
    /// Derived from the cell itself, so equal cells always share a key.
    pub fn shard_key(self) -> i32 {
        let ancestor = self.0.parent(SHARD_RESOLUTION).unwrap_or(self.0);
        ((u64::from(ancestor) >> SHARD_KEY_SHIFT) & SHARD_KEY_MASK) as i32
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MUNICH: (f64, f64) = (11.5755, 48.1374);

    #[test]
    fn only_fine_resolutions_are_accepted() {
        for value in GridResolution::ALLOWED {
            let resolution = GridResolution::try_from(value).expect("allowed");
            assert_eq!(resolution.as_u8(), value);
        }
        for value in [0, 3, 7, 11, 15] {
            let err = GridResolution::try_from(value).expect_err("rejected");
            assert!(matches!(err, HeatmapError::InvalidResolution { resolution } if resolution == value));
        }
    }

    #[test]
    fn cell_has_requested_resolution() {
        let point = Point::new(MUNICH.0, MUNICH.1);
        for resolution in [GridResolution::Eight, GridResolution::Nine, GridResolution::Ten] {
            let cell = GridCell::for_point(point, resolution).expect("cell");
            assert_eq!(cell.resolution(), resolution.as_u8());
        }
    }

    #[test]
    fn storage_form_roundtrips() {
        let cell = GridCell::for_point(Point::new(MUNICH.0, MUNICH.1), GridResolution::Nine)
            .expect("cell");
        assert!(cell.as_i64() > 0);
        assert_eq!(GridCell::from_i64(cell.as_i64()).expect("decode"), cell);
    }

    #[test]
    fn shard_key_matches_resolution_three_ancestor() {
        let cell = GridCell::for_point(Point::new(MUNICH.0, MUNICH.1), GridResolution::Ten)
            .expect("cell");
        let ancestor = cell.cell_index().parent(Resolution::Three).expect("parent");
        let sibling_in_same_ancestor = ancestor
            .center_child(Resolution::Ten)
            .map(GridCell)
            .expect("child");
        assert_eq!(cell.shard_key(), sibling_in_same_ancestor.shard_key());
        assert!((0..65_536).contains(&cell.shard_key()));
    }

    #[test]
    fn shard_key_is_a_function_of_the_cell() {
        let a = GridCell::for_point(Point::new(MUNICH.0, MUNICH.1), GridResolution::Nine)
            .expect("cell");
        let b = GridCell::from_i64(a.as_i64()).expect("cell");
        assert_eq!(a.shard_key(), b.shard_key());

        let far = GridCell::for_point(Point::new(-74.006, 40.7128), GridResolution::Nine)
            .expect("cell");
        assert_ne!(a.shard_key(), far.shard_key());
    }

    #[test]
    fn rejects_non_finite_points() {
        let err = GridCell::for_point(Point::new(f64::NAN, 48.0), GridResolution::Nine);
        assert!(matches!(err, Err(HeatmapError::Geometry { .. })));
    }
}
