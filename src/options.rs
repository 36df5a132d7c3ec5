//! # Container launch options.
//!
//! [`LaunchOptions`] describes the container the guardian child runs: an image
//! reference (always present), an optional container name, and engine-specific
//! creation parameters in Docker Engine API shape.
//!
//! ## JSON form
//! ```json
//! {
//!   "image": "httpd",
//!   "name": "web",
//!   "config": {
//!     "Env": ["MODE=test"],
//!     "HostConfig": { "PortBindings": { "80/tcp": [{ "HostIp": "127.0.0.1", "HostPort": "9200" }] } }
//!   }
//! }
//! ```
//!
//! `config.Image` is ignored in favour of `image`, and `HostConfig.AutoRemove`
//! is always forced on.

use std::collections::HashMap;
use std::time::Duration;

use bollard::models::{ContainerCreateBody, HostConfig, PortBinding};
use serde::{Deserialize, Serialize};

use crate::time::millis;

/// Describes the container to launch.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LaunchOptions {
    /// Image reference, e.g. `httpd`, `nginx:1.27` or `registry:5000/app@sha256:...`.
    pub image: String,

    /// Optional container name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Engine creation parameters (Docker `ContainerCreateBody`).
    #[serde(default)]
    pub config: ContainerCreateBody,
}

impl LaunchOptions {
    /// Creates options for `image` with default creation parameters.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    /// Sets the container name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Appends a `KEY=VALUE` environment entry.
    pub fn env(mut self, entry: impl Into<String>) -> Self {
        self.config.env.get_or_insert_with(Vec::new).push(entry.into());
        self
    }

    /// Publishes `container_port` (e.g. `"80/tcp"`) on `host_ip:host_port`.
    pub fn publish(
        mut self,
        host_ip: impl Into<String>,
        host_port: u16,
        container_port: impl Into<String>,
    ) -> Self {
        let bindings = self
            .host_config()
            .port_bindings
            .get_or_insert_with(HashMap::new)
            .entry(container_port.into())
            .or_insert_with(|| Some(Vec::new()));
        bindings.get_or_insert_with(Vec::new).push(PortBinding {
            host_ip: Some(host_ip.into()),
            host_port: Some(host_port.to_string()),
        });
        self
    }

    /// Forces auto-remove on, whatever the caller asked for.
    pub fn force_auto_remove(mut self) -> Self {
        self.host_config().auto_remove = Some(true);
        self
    }

    /// Returns `true` if auto-remove is set.
    pub fn auto_remove(&self) -> bool {
        self.config
            .host_config
            .as_ref()
            .and_then(|h| h.auto_remove)
            .unwrap_or(false)
    }

    /// Builds the engine creation body: image filled in, auto-remove forced.
    pub fn into_create_body(self) -> ContainerCreateBody {
        let image = self.image.clone();
        let mut config = self.force_auto_remove().config;
        config.image = Some(image);
        config
    }

    fn host_config(&mut self) -> &mut HostConfig {
        self.config.host_config.get_or_insert_with(HostConfig::default)
    }
}

/// What the supervisor hands to its guardian child on the command line.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChildRequest {
    /// The container to run.
    pub options: LaunchOptions,
    /// Watchdog period in milliseconds.
    pub watchdog_period_ms: u64,
}

impl ChildRequest {
    /// Bundles options with a watchdog period.
    pub fn new(options: LaunchOptions, watchdog_period: Duration) -> Self {
        Self {
            options,
            watchdog_period_ms: millis(watchdog_period),
        }
    }

    /// Watchdog period as a [`Duration`].
    #[inline]
    pub fn watchdog_period(&self) -> Duration {
        Duration::from_millis(self.watchdog_period_ms)
    }
}

/// Splits an image reference into `(repository, tag)` for pulling.
///
/// - a `:` inside the registry host (`host:5000/app`) is a port, not a tag
/// - digest references (`app@sha256:...`) are pulled as-is with no tag
/// - a missing tag means `latest`
pub fn split_image_reference(image: &str) -> (&str, Option<&str>) {
    if image.contains('@') {
        return (image, None);
    }
    let last_segment = image.rsplit('/').next().unwrap_or(image);
    match last_segment.rsplit_once(':') {
        Some((_, tag)) => {
            let repo = &image[..image.len() - tag.len() - 1];
            (repo, Some(tag))
        }
        None => (image, Some("latest")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn auto_remove_is_forced_even_when_disabled() {
        let mut opts = LaunchOptions::new("httpd");
        opts.config.host_config = Some(HostConfig {
            auto_remove: Some(false),
            ..HostConfig::default()
        });

        let body = opts.into_create_body();
        assert_eq!(body.image.as_deref(), Some("httpd"));
        assert_eq!(body.host_config.and_then(|h| h.auto_remove), Some(true));
    }

    #[test]
    fn image_field_wins_over_config_image() {
        let mut opts = LaunchOptions::new("httpd:2.4");
        opts.config.image = Some("nginx".into());
        assert_eq!(opts.into_create_body().image.as_deref(), Some("httpd:2.4"));
    }

    #[test]
    fn parses_engine_shaped_json() {
        let value = json!({
            "image": "httpd",
            "config": {
                "Env": ["A=1"],
                "HostConfig": {
                    "PortBindings": { "80/tcp": [{ "HostIp": "127.0.0.1", "HostPort": "9200" }] }
                }
            }
        });
        let opts: LaunchOptions = serde_json::from_value(value).unwrap();
        assert_eq!(opts.image, "httpd");
        assert_eq!(opts.config.env, Some(vec!["A=1".to_string()]));

        let ports = opts
            .config
            .host_config
            .and_then(|h| h.port_bindings)
            .unwrap();
        let binding = &ports["80/tcp"].as_ref().unwrap()[0];
        assert_eq!(binding.host_port.as_deref(), Some("9200"));
    }

    #[test]
    fn image_is_required() {
        let res = serde_json::from_value::<LaunchOptions>(json!({ "name": "web" }));
        assert!(res.is_err());
    }

    #[test]
    fn publish_and_env_build_host_config() {
        let opts = LaunchOptions::new("httpd")
            .with_name("web")
            .env("MODE=test")
            .publish("127.0.0.1", 9200, "80/tcp")
            .publish("127.0.0.1", 9201, "80/tcp");

        assert_eq!(opts.name.as_deref(), Some("web"));
        assert!(!opts.auto_remove());
        let ports = opts.config.host_config.unwrap().port_bindings.unwrap();
        assert_eq!(ports["80/tcp"].as_ref().unwrap().len(), 2);
    }

    #[test]
    fn child_request_survives_the_command_line() {
        let req = ChildRequest::new(LaunchOptions::new("httpd"), Duration::from_millis(500));
        let arg = serde_json::to_string(&req).unwrap();
        let back: ChildRequest = serde_json::from_str(&arg).unwrap();
        assert_eq!(back.options.image, "httpd");
        assert_eq!(back.watchdog_period(), Duration::from_millis(500));
    }

    #[test]
    fn splits_image_references_like_the_docker_cli() {
        assert_eq!(split_image_reference("httpd"), ("httpd", Some("latest")));
        assert_eq!(split_image_reference("nginx:1.27"), ("nginx", Some("1.27")));
        assert_eq!(
            split_image_reference("localhost:5000/app"),
            ("localhost:5000/app", Some("latest"))
        );
        assert_eq!(
            split_image_reference("localhost:5000/team/app:v2"),
            ("localhost:5000/team/app", Some("v2"))
        );
        assert_eq!(
            split_image_reference("app@sha256:abcd"),
            ("app@sha256:abcd", None)
        );
    }
}
