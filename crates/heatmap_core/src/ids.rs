use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::{HeatmapError, HeatmapResult};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ScenarioId(pub Uuid);

impl ScenarioId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid_str(value: &str) -> HeatmapResult<Self> {
        let uuid = Uuid::parse_str(value).map_err(|err| {
            HeatmapError::validation(format!("invalid scenario id '{value}': {err}"))
        })?;
        Ok(Self(uuid))
    }

    pub fn to_uuid_string(self) -> String {
        self.0.to_string()
    }

    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for ScenarioId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ScenarioId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_uuid_string())
    }
}

impl<'de> Deserialize<'de> for ScenarioId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Uuid::parse_str(&value)
            .map(Self)
            .map_err(|_| serde::de::Error::custom("invalid scenario id string"))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub i64);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct LayerProjectId(pub i64);

macro_rules! int_id_wrapper {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_i64(self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                Ok(Self(i64::deserialize(deserializer)?))
            }
        }
    };
}

int_id_wrapper!(FeatureId);
int_id_wrapper!(LayerProjectId);
