// ABOUTME: Config scaffolding for new setups.
// ABOUTME: Writes a commented registry-gc.yml template.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

const DEFAULT_REGISTRY: &str = "https://registry.example.com";

pub fn init_config(dir: &Path, registry: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let registry = registry.unwrap_or(DEFAULT_REGISTRY);
    if registry.trim().is_empty() {
        return Err(Error::InvalidConfig("registry URL cannot be empty".to_string()));
    }

    std::fs::write(&config_path, generate_template_yaml(registry))?;

    Ok(())
}

fn generate_template_yaml(registry: &str) -> String {
    format!(
        r#"registry:
  # kind: http | ecr
  url: {registry}
  # For kind: ecr, url is an optional endpoint override
  # region: us-east-1
  # registry_id: "123456789012"
  # username:
  #   env: REGISTRY_USERNAME
  # password:
  #   env: REGISTRY_PASSWORD
  timeout: 30s

policy:
  delete_untagged: true
  keep:
    release: 4
    build: 8
  # max_images: 900

# Limit processing to these repositories (default: all)
repositories: []

execution:
  batch_size: 100
  concurrency: 4
  retry:
    attempts: 3
    backoff: 2s
  # wait_for_credentials: 30s

exporter:
  listen: 0.0.0.0:8070
  path: /metrics
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn template_parses_as_config() {
        let config = Config::from_yaml(&generate_template_yaml(DEFAULT_REGISTRY)).unwrap();
        assert_eq!(config.registry.url, DEFAULT_REGISTRY);
        assert!(config.policy.delete_untagged);
        assert_eq!(config.policy.keep.get("release"), Some(4));
        assert!(config.policy.max_images.is_none());
    }
}
