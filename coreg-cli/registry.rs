use crate::config::PipelineConfig;
use crate::{CoregError, CoregResult, FeatureMatcher, OrbMatcher, SiftMatcher};

/// The fixed set of registered matcher variants, as shown to the UI layer.
const NAMES: [&str; 2] = ["orb", "sift"];

pub fn matcher_names() -> &'static [&'static str] {
    &NAMES
}

/// Instantiate a matcher by registered name with default settings. Every
/// call builds fresh detector state; instances share nothing.
pub fn create_matcher(name: &str) -> CoregResult<Box<dyn FeatureMatcher>> {
    create(name, &PipelineConfig::default())
}

/// Instantiate the matcher named by `config.matcher`, honoring its
/// detector, matching, and consensus settings.
pub fn create_matcher_with(config: &PipelineConfig) -> CoregResult<Box<dyn FeatureMatcher>> {
    create(&config.matcher, config)
}

fn create(name: &str, config: &PipelineConfig) -> CoregResult<Box<dyn FeatureMatcher>> {
    match name {
        "orb" => Ok(Box::new(OrbMatcher::with_configs(
            config.orb.clone(),
            config.matching.clone(),
            config.ransac.clone(),
        )?)),
        "sift" => Ok(Box::new(SiftMatcher::with_configs(
            config.sift.clone(),
            config.matching.clone(),
            config.ransac.clone(),
        )?)),
        other => Err(CoregError::UnknownMatcher(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_registered_name_constructs() {
        for name in matcher_names() {
            let matcher = create_matcher(name).unwrap();
            assert_eq!(&matcher.name(), name);
        }
    }

    #[test]
    fn test_unknown_name_error_mentions_the_name() {
        let err = create_matcher("unknown-name").err().unwrap();
        assert!(matches!(err, CoregError::UnknownMatcher(_)));
        assert!(err.to_string().contains("unknown-name"));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert!(create_matcher("ORB").is_err());
    }

    #[test]
    fn test_create_with_config_honors_matcher_field() {
        let config = PipelineConfig { matcher: "sift".to_string(), ..PipelineConfig::default() };
        let matcher = create_matcher_with(&config).unwrap();
        assert_eq!(matcher.name(), "sift");
    }

    #[test]
    fn test_create_with_invalid_settings_fails() {
        let mut config = PipelineConfig::default();
        config.orb.threshold = 0;
        assert!(matches!(create_matcher_with(&config), Err(CoregError::Detect(_))));
    }
}
