use coreg_detect::{OrbConfig, SiftConfig};
use coreg_match::{MatchConfig, RansacConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{registry, CoregError, CoregResult};

/// Complete pipeline configuration: which matcher variant to run and the
/// settings for every stage.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PipelineConfig {
    /// Registered matcher variant name.
    pub matcher: String,
    /// Rayon thread pool size.
    pub n_threads: usize,
    pub orb: OrbConfig,
    pub sift: SiftConfig,
    pub matching: MatchConfig,
    pub ransac: RansacConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            matcher: "orb".to_string(),
            n_threads: num_cpus::get().max(1),
            orb: OrbConfig::default(),
            sift: SiftConfig::default(),
            matching: MatchConfig::default(),
            ransac: RansacConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate the settings that are cheap to check up front.
    pub fn validate(&self) -> CoregResult<()> {
        if !registry::matcher_names().contains(&self.matcher.as_str()) {
            return Err(CoregError::UnknownMatcher(self.matcher.clone()));
        }
        Ok(())
    }

    /// Generate a human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "PipelineConfig: matcher={}, threads={}, ransac=[threshold:{}, trials:{}], cross_check={}",
            self.matcher,
            self.n_threads,
            self.ransac.residual_threshold,
            self.ransac.max_trials,
            self.matching.cross_check
        )
    }

    /// Save configuration to a JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from a TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unknown_matcher_fails_validation() {
        let config = PipelineConfig { matcher: "surf".to_string(), ..PipelineConfig::default() };
        let err = config.validate().err().unwrap();
        assert!(err.to_string().contains("surf"));
    }

    #[test]
    fn test_summary_names_the_matcher() {
        let config = PipelineConfig::default();
        assert!(config.summary().contains("orb"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_round_trip() {
        let mut config = PipelineConfig::default();
        config.ransac.max_trials = 250;
        config.ransac.seed = Some(5);
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ransac.max_trials, 250);
        assert_eq!(back.ransac.seed, Some(5));
        assert_eq!(back.matcher, config.matcher);
    }
}
