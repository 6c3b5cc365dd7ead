use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::FeatureGeometry;
use crate::ids::FeatureId;
use crate::{HeatmapError, HeatmapResult};

#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: FeatureGeometry,
    pub potential: Option<f64>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditType {
    New,
    Modified,
    Deleted,
}

impl EditType {
    pub fn code(self) -> &'static str {
        match self {
            EditType::New => "n",
            EditType::Modified => "m",
            EditType::Deleted => "d",
        }
    }

    /// Whether an edit of this type contributes its own row to the merge.
    pub fn supplies_row(self) -> bool {
        matches!(self, EditType::New | EditType::Modified)
    }
}

impl FromStr for EditType {
    type Err = HeatmapError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "n" | "new" => Ok(EditType::New),
            "m" | "modified" => Ok(EditType::Modified),
            "d" | "deleted" => Ok(EditType::Deleted),
            other => Err(HeatmapError::validation(format!(
                "unknown scenario edit type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for EditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioEdit {
    pub feature_id: FeatureId,
    pub edit_type: EditType,
    pub geometry: Option<FeatureGeometry>,
    pub potential: Option<f64>,
}

impl ScenarioEdit {
    pub fn into_feature(self) -> HeatmapResult<Feature> {
        let geometry = self.geometry.ok_or_else(|| {
            HeatmapError::validation(format!(
                "scenario edit for feature {} ({}) has no geometry",
                self.feature_id, self.edit_type
            ))
        })?;
        Ok(Feature {
            id: self.feature_id,
            geometry,
            potential: self.potential,
        })
    }
}
