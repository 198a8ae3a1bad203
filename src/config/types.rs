use std::collections::BTreeMap;

use serde::Deserialize;

pub const DEFAULT_IMAGE: &str = "golang:latest";
pub const DEFAULT_NETWORK_MODE: &str = "host";

/// Special `User` value: run the command as the invoking host user.
pub const HOST_USER: &str = "host";

/// One config file as written on disk. `None` means the key was not set, so
/// a lower-priority layer keeps its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ConfigLayer {
    pub image: Option<String>,
    pub min_version_number: Option<i64>,
    pub container_env: Option<BTreeMap<String, String>>,
    pub user: Option<String>,
    pub privileged: Option<bool>,
    pub network_mode: Option<String>,
    /// Container path → cache name; see [`Settings::cache_mounts`].
    pub cache_mounts: Option<BTreeMap<String, String>>,
}

impl ConfigLayer {
    /// Lay `higher` over `self`. Scalars set in `higher` replace ours; maps
    /// are merged key by key with `higher` winning on conflicts.
    pub fn overlay(self, higher: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            image: higher.image.or(self.image),
            min_version_number: higher.min_version_number.or(self.min_version_number),
            container_env: merge_maps(self.container_env, higher.container_env),
            user: higher.user.or(self.user),
            privileged: higher.privileged.or(self.privileged),
            network_mode: higher.network_mode.or(self.network_mode),
            cache_mounts: merge_maps(self.cache_mounts, higher.cache_mounts),
        }
    }
}

fn merge_maps(
    lower: Option<BTreeMap<String, String>>,
    higher: Option<BTreeMap<String, String>>,
) -> Option<BTreeMap<String, String>> {
    match (lower, higher) {
        (Some(mut lower), Some(higher)) => {
            lower.extend(higher);
            Some(lower)
        }
        (lower, higher) => higher.or(lower),
    }
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub image: String,
    pub min_version_number: i64,
    pub container_env: BTreeMap<String, String>,
    /// Exec user inside the container; [`HOST_USER`] maps to the caller's uid:gid.
    pub user: Option<String>,
    pub privileged: bool,
    pub network_mode: String,
    /// Container path → name of a host cache directory kept across runs.
    pub cache_mounts: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(ConfigLayer::default())
    }
}

impl Settings {
    pub fn resolve(layer: ConfigLayer) -> Self {
        Self {
            image: non_blank(layer.image).unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
            min_version_number: layer.min_version_number.unwrap_or(0),
            container_env: layer.container_env.unwrap_or_default(),
            user: non_blank(layer.user),
            privileged: layer.privileged.unwrap_or(false),
            network_mode: non_blank(layer.network_mode)
                .unwrap_or_else(|| DEFAULT_NETWORK_MODE.to_string()),
            cache_mounts: layer.cache_mounts.unwrap_or_default(),
        }
    }

    pub fn uses_default_image(&self) -> bool {
        self.image == DEFAULT_IMAGE
    }

    /// `KEY=value` pairs in key order.
    pub fn env_pairs(&self) -> Vec<String> {
        self.container_env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Option<BTreeMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.image, DEFAULT_IMAGE);
        assert_eq!(s.network_mode, "host");
        assert_eq!(s.min_version_number, 0);
        assert!(!s.privileged);
        assert!(s.user.is_none());
        assert!(s.uses_default_image());
    }

    #[test]
    fn overlay_only_replaces_fields_that_are_set() {
        let project = ConfigLayer {
            image: Some("redis-test:7".into()),
            min_version_number: Some(100),
            privileged: Some(true),
            ..ConfigLayer::default()
        };
        let home = ConfigLayer {
            user: Some("dev".into()),
            ..ConfigLayer::default()
        };

        let merged = project.overlay(home);
        assert_eq!(merged.image.as_deref(), Some("redis-test:7"));
        assert_eq!(merged.min_version_number, Some(100));
        assert_eq!(merged.privileged, Some(true));
        assert_eq!(merged.user.as_deref(), Some("dev"));
    }

    #[test]
    fn overlay_higher_layer_wins_when_both_set() {
        let project = ConfigLayer {
            image: Some("a:1".into()),
            privileged: Some(true),
            ..ConfigLayer::default()
        };
        let home = ConfigLayer {
            image: Some("b:2".into()),
            privileged: Some(false),
            ..ConfigLayer::default()
        };
        let merged = project.overlay(home);
        assert_eq!(merged.image.as_deref(), Some("b:2"));
        assert_eq!(merged.privileged, Some(false));
    }

    #[test]
    fn env_maps_merge_per_key() {
        let project = ConfigLayer {
            container_env: env(&[("REDIS_PORT", "6379"), ("CGO_ENABLED", "0")]),
            ..ConfigLayer::default()
        };
        let home = ConfigLayer {
            container_env: env(&[("GOPROXY", "https://goproxy.io"), ("CGO_ENABLED", "1")]),
            ..ConfigLayer::default()
        };
        let settings = Settings::resolve(project.overlay(home));
        assert_eq!(
            settings.env_pairs(),
            vec!["CGO_ENABLED=1", "GOPROXY=https://goproxy.io", "REDIS_PORT=6379"]
        );
    }

    #[test]
    fn blank_strings_fall_back_to_defaults() {
        let layer = ConfigLayer {
            image: Some(String::new()),
            network_mode: Some("  ".into()),
            user: Some(String::new()),
            ..ConfigLayer::default()
        };
        let s = Settings::resolve(layer);
        assert_eq!(s.image, DEFAULT_IMAGE);
        assert_eq!(s.network_mode, DEFAULT_NETWORK_MODE);
        assert_eq!(s.user, None);
    }

    #[test]
    fn deserializes_pascal_case_keys() {
        let yaml = "\
Image: goredis/grte:latest
MinVersionNumber: 100
ContainerEnv:
  REDIS_VERSION: \"7.2\"
CacheMounts:
  /go: gopath
Unknown: ignored
";
        let layer: ConfigLayer = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(layer.image.as_deref(), Some("goredis/grte:latest"));
        assert_eq!(layer.min_version_number, Some(100));
        assert_eq!(layer.container_env, env(&[("REDIS_VERSION", "7.2")]));
        assert_eq!(layer.cache_mounts, env(&[("/go", "gopath")]));
        assert_eq!(layer.privileged, None);
    }
}
