use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CollageSpec, Result, ShotPlan, TickPacing};

/// Top-level configuration structure for the booth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub plan: ShotPlan,
    pub collage: CollageSpec,
    pub pacing: TickPacing,
}

impl AppConfig {
    /// Reads a JSON config; missing sections fall back to their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json(&raw)?;
        tracing::debug!(?path, shots = config.plan.shot_count(), "config loaded");
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.collage.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoothError;

    #[test]
    fn empty_object_yields_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn default_config_round_trips() {
        let json = AppConfig::default().to_json_pretty().unwrap();
        assert!(json.contains("\"#f8f5e6\""));
        assert_eq!(AppConfig::from_json(&json).unwrap(), AppConfig::default());
    }

    #[test]
    fn invalid_plan_surfaces_as_config_error() {
        let err = AppConfig::from_json(r#"{"plan": [[1, 2]]}"#).unwrap_err();
        assert!(matches!(err, BoothError::Config(_)));
        assert!(format!("{err}").contains("must end at 1"));
    }

    #[test]
    fn invalid_collage_is_rejected() {
        let err = AppConfig::from_json(r#"{"collage": {"columns": 0}}"#).unwrap_err();
        assert!(matches!(err, BoothError::InvalidSpec(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AppConfig::load("/no/such/frameit.json").unwrap_err();
        assert!(matches!(err, BoothError::Io(_)));
    }
}
