use super::scrape::ScrapeStrategy;
use super::stage::PipelineStage;
use crate::config::{ConfigError, DeployConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const SITE_OBJECT_MARKER: &str = "New site object ID: ";
pub const BLOB_ID_MARKER: &str = "Blob ID: ";
pub const CONTENT_SCHEME: &str = "ipfs://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeployProfileKind {
    /// Front-end build followed by a site-builder publish of `dist/`
    #[default]
    SiteBuilder,
    /// Publish the materialized root as-is through the storage CLI
    ContentPublish,
    /// Stages declared in the configuration file
    Custom,
}

impl DeployProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployProfileKind::SiteBuilder => "site-builder",
            DeployProfileKind::ContentPublish => "content-publish",
            DeployProfileKind::Custom => "custom",
        }
    }
}

impl fmt::Display for DeployProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeployProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "site-builder" | "site_builder" => Ok(DeployProfileKind::SiteBuilder),
            "content-publish" | "content_publish" => Ok(DeployProfileKind::ContentPublish),
            "custom" => Ok(DeployProfileKind::Custom),
            other => Err(format!(
                "Unknown deploy profile '{}'. Valid options: site-builder, content-publish, custom",
                other
            )),
        }
    }
}

/// Concrete stage list plus the identifier conventions of its final stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployProfile {
    pub kind: DeployProfileKind,
    pub stages: Vec<PipelineStage>,
    pub scrape: Vec<ScrapeStrategy>,
    pub stage_timeout: Duration,
}

impl DeployProfile {
    pub fn site_builder(config: &DeployConfig) -> Self {
        let epochs = config.epochs.to_string();
        Self {
            kind: DeployProfileKind::SiteBuilder,
            stages: vec![
                PipelineStage::new("install", ["npm", "install"]),
                PipelineStage::new("build", ["npm", "run", "build"]).expecting("dist"),
                PipelineStage::new(
                    "publish",
                    [
                        config.site_builder_path.as_str(),
                        "--config",
                        config.sites_config.as_str(),
                        "publish",
                        "dist",
                        "--epochs",
                        epochs.as_str(),
                    ],
                ),
            ],
            scrape: vec![
                ScrapeStrategy::labeled(SITE_OBJECT_MARKER),
                ScrapeStrategy::scheme(CONTENT_SCHEME),
            ],
            stage_timeout: Duration::from_secs(config.stage_timeout_secs),
        }
    }

    pub fn content_publish(config: &DeployConfig) -> Self {
        let epochs = config.epochs.to_string();
        Self {
            kind: DeployProfileKind::ContentPublish,
            stages: vec![PipelineStage::new(
                "publish",
                [
                    config.publish_cli_path.as_str(),
                    "store",
                    "--epochs",
                    epochs.as_str(),
                    ".",
                ],
            )],
            scrape: vec![
                ScrapeStrategy::labeled(BLOB_ID_MARKER),
                ScrapeStrategy::scheme(CONTENT_SCHEME),
            ],
            stage_timeout: Duration::from_secs(config.stage_timeout_secs),
        }
    }

    /// Builds the configured profile; configured scrape strategies replace the defaults.
    pub fn from_config(config: &DeployConfig) -> Result<Self, ConfigError> {
        let mut profile = match config.profile {
            DeployProfileKind::SiteBuilder => Self::site_builder(config),
            DeployProfileKind::ContentPublish => Self::content_publish(config),
            DeployProfileKind::Custom => {
                if config.stages.is_empty() {
                    return Err(ConfigError::ValidationFailed(
                        "The custom deploy profile requires at least one stage".to_string(),
                    ));
                }
                if config.scrape.is_empty() {
                    return Err(ConfigError::ValidationFailed(
                        "The custom deploy profile requires at least one scrape strategy"
                            .to_string(),
                    ));
                }
                Self {
                    kind: DeployProfileKind::Custom,
                    stages: config.stages.clone(),
                    scrape: Vec::new(),
                    stage_timeout: Duration::from_secs(config.stage_timeout_secs),
                }
            }
        };

        if !config.scrape.is_empty() {
            profile.scrape = config.scrape.clone();
        }
        Ok(profile)
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_builder_profile() {
        let config = DeployConfig::default();
        let profile = DeployProfile::from_config(&config).unwrap();

        assert_eq!(profile.kind, DeployProfileKind::SiteBuilder);
        assert_eq!(profile.stage_names(), vec!["install", "build", "publish"]);
        assert_eq!(
            profile.stages[2].command,
            vec![
                "site-builder",
                "--config",
                "sites-config.yaml",
                "publish",
                "dist",
                "--epochs",
                "2"
            ]
        );
        assert_eq!(
            profile.stages[1].expect_path.as_deref(),
            Some(std::path::Path::new("dist"))
        );
        assert_eq!(profile.scrape[0], ScrapeStrategy::labeled(SITE_OBJECT_MARKER));
    }

    #[test]
    fn test_content_publish_profile() {
        let config = DeployConfig {
            profile: DeployProfileKind::ContentPublish,
            publish_cli_path: "/usr/local/bin/walrus".to_string(),
            epochs: 5,
            ..DeployConfig::default()
        };
        let profile = DeployProfile::from_config(&config).unwrap();

        assert_eq!(profile.stage_names(), vec!["publish"]);
        assert_eq!(
            profile.stages[0].command,
            vec!["/usr/local/bin/walrus", "store", "--epochs", "5", "."]
        );
        assert_eq!(profile.scrape[0], ScrapeStrategy::labeled(BLOB_ID_MARKER));
    }

    #[test]
    fn test_custom_profile_requires_stages() {
        let config = DeployConfig {
            profile: DeployProfileKind::Custom,
            ..DeployConfig::default()
        };
        assert!(DeployProfile::from_config(&config).is_err());
    }

    #[test]
    fn test_custom_profile() {
        let config = DeployConfig {
            profile: DeployProfileKind::Custom,
            stages: vec![PipelineStage::new("upload", ["./upload.sh"])],
            scrape: vec![ScrapeStrategy::labeled("URL: ")],
            ..DeployConfig::default()
        };
        let profile = DeployProfile::from_config(&config).unwrap();
        assert_eq!(profile.stage_names(), vec!["upload"]);
        assert_eq!(profile.scrape, vec![ScrapeStrategy::labeled("URL: ")]);
    }

    #[test]
    fn test_profile_kind_parsing() {
        assert_eq!(
            "content-publish".parse::<DeployProfileKind>().unwrap(),
            DeployProfileKind::ContentPublish
        );
        assert!("ftp".parse::<DeployProfileKind>().is_err());
        assert_eq!(DeployProfileKind::default().to_string(), "site-builder");
    }
}
