use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeatmapError {
    #[error("invalid grid resolution {resolution}: expected one of 8, 9, 10")]
    InvalidResolution { resolution: u8 },
    #[error("validation error: {message}")]
    Validation { message: String },
    #[error("geometry error: {message}")]
    Geometry { message: String },
    #[error("upstream query failed: {0}")]
    UpstreamQuery(#[from] sea_orm::DbErr),
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl HeatmapError {
    pub fn invalid_resolution(resolution: u8) -> Self {
        Self::InvalidResolution { resolution }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn geometry(message: impl Into<String>) -> Self {
        Self::Geometry {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

pub type HeatmapResult<T> = Result<T, HeatmapError>;

#[cfg(test)]
mod tests {
    use super::HeatmapError;

    #[test]
    fn helper_constructors_set_variants() {
        let err = HeatmapError::invalid_resolution(7);
        assert!(matches!(err, HeatmapError::InvalidResolution { resolution: 7 }));
        let err = HeatmapError::validation("bad");
        assert!(matches!(err, HeatmapError::Validation { .. }));
        let err = HeatmapError::geometry("empty");
        assert!(matches!(err, HeatmapError::Geometry { .. }));
        let err = HeatmapError::storage("disk");
        assert!(matches!(err, HeatmapError::Storage { .. }));
    }

    #[test]
    fn upstream_errors_keep_the_store_message() {
        let err = HeatmapError::from(sea_orm::DbErr::Custom("no such table: pois".to_string()));
        assert!(err.to_string().contains("no such table: pois"));
    }
}
