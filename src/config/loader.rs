// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::allow_list::AllowList;
use crate::config::consts::{DEFAULT_RPC_METHODS, ENV_ALLOW_BUILTIN, ENV_ALLOW_EXTERNAL};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for the task runner.
///
/// Loaded from a YAML (or TOML, by file extension) file. Every field is optional;
/// an empty file yields a runner that permits no modules at all.
///
/// # Example
/// ```yaml
/// sandbox:
///   allowed_builtin_modules: "path,util"
///   allowed_external_modules: "moment"
///   external_modules:
///     moment: vendor/moment.js
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

/// Sandbox capability configuration.
///
/// # Fields
/// * `allowed_builtin_modules` - Comma-separated built-in module ids, or `*`
/// * `allowed_external_modules` - Comma-separated external module ids, or `*`
/// * `external_modules` - External module id to CommonJS source file
/// * `rpc_methods` - Orchestrator RPC methods reachable through `helpers` (optional)
#[derive(Debug, Default, Deserialize)]
pub struct SandboxConfig {
    #[serde(default)]
    pub allowed_builtin_modules: Option<String>,
    #[serde(default)]
    pub allowed_external_modules: Option<String>,
    #[serde(default)]
    pub external_modules: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub rpc_methods: Option<Vec<String>>,
}

impl SandboxConfig {
    pub fn builtin_allow_list(&self) -> AllowList {
        parse_allow_list(self.allowed_builtin_modules.as_deref())
    }

    pub fn external_allow_list(&self) -> AllowList {
        parse_allow_list(self.allowed_external_modules.as_deref())
    }

    /// RPC methods exposed to sandboxed code, falling back to the built-in set.
    pub fn rpc_methods(&self) -> Vec<String> {
        match &self.rpc_methods {
            Some(methods) => methods.clone(),
            None => DEFAULT_RPC_METHODS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

fn parse_allow_list(raw: Option<&str>) -> AllowList {
    raw.map(|raw| raw.parse().unwrap_or_default())
        .unwrap_or_default()
}

impl RunnerConfig {
    /// Apply allow-list overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply allow-list overrides from an arbitrary variable source.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(builtin) = lookup(ENV_ALLOW_BUILTIN) {
            self.sandbox.allowed_builtin_modules = Some(builtin);
        }
        if let Some(external) = lookup(ENV_ALLOW_EXTERNAL) {
            self.sandbox.allowed_external_modules = Some(external);
        }
        self
    }

    /// Resolve relative external module paths against `base`.
    fn resolve_paths(mut self, base: &Path) -> Self {
        for path in self.sandbox.external_modules.values_mut() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }
}

/// Load a runner config from a YAML or TOML file.
///
/// External module paths are resolved relative to the config file's directory.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunnerConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let cfg: RunnerConfig = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&content)?,
        _ => parse_yaml(&content)?,
    };

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(cfg.resolve_paths(base))
}

/// Empty YAML documents deserialize as `null`; treat them as all-defaults.
fn parse_yaml(content: &str) -> Result<RunnerConfig, ConfigError> {
    if content.trim().is_empty() {
        return Ok(RunnerConfig::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn parse_basic_config() {
        let yaml = r#"
sandbox:
  allowed_builtin_modules: "path, util"
  allowed_external_modules: "*"
  external_modules:
    lodash: vendor/lodash.js
"#;

        let cfg: RunnerConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.sandbox.builtin_allow_list().permits("util"));
        assert!(!cfg.sandbox.builtin_allow_list().permits("fs"));
        assert_eq!(cfg.sandbox.external_allow_list(), AllowList::All);
        assert_eq!(cfg.sandbox.external_modules.len(), 1);
    }

    #[test]
    fn test_defaults_permit_nothing() {
        let cfg = RunnerConfig::default();
        assert_eq!(cfg.sandbox.builtin_allow_list(), AllowList::none());
        assert_eq!(cfg.sandbox.external_allow_list(), AllowList::none());
        assert_eq!(cfg.sandbox.rpc_methods().len(), DEFAULT_RPC_METHODS.len());
    }

    #[test]
    fn test_env_overrides_replace_file_values() {
        let yaml = r#"
sandbox:
  allowed_builtin_modules: "path"
"#;
        let cfg: RunnerConfig = serde_yaml::from_str(yaml).unwrap();
        let env = HashMap::from([(ENV_ALLOW_BUILTIN, "util,events"), (ENV_ALLOW_EXTERNAL, "*")]);

        let cfg = cfg.with_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        let builtin = cfg.sandbox.builtin_allow_list();
        assert!(!builtin.permits("path"));
        assert!(builtin.permits("events"));
        assert_eq!(cfg.sandbox.external_allow_list(), AllowList::All);
    }

    #[test]
    fn test_load_yaml_resolves_module_paths() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("runner.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            "sandbox:\n  allowed_external_modules: greeter\n  external_modules:\n    greeter: modules/greeter.js"
        )
        .unwrap();

        let cfg = load_config(&config_path).unwrap();
        assert_eq!(
            cfg.sandbox.external_modules["greeter"],
            dir.path().join("modules/greeter.js")
        );
    }

    #[test]
    fn test_load_toml_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("runner.toml");
        std::fs::write(
            &config_path,
            "[sandbox]\nallowed_builtin_modules = \"*\"\nrpc_methods = [\"helpers.httpRequest\"]\n",
        )
        .unwrap();

        let cfg = load_config(&config_path).unwrap();
        assert_eq!(cfg.sandbox.builtin_allow_list(), AllowList::All);
        assert_eq!(cfg.sandbox.rpc_methods(), vec!["helpers.httpRequest".to_string()]);
    }

    #[test]
    fn test_empty_yaml_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("empty.yaml");
        std::fs::write(&config_path, "\n").unwrap();

        let cfg = load_config(&config_path).unwrap();
        assert!(cfg.sandbox.external_modules.is_empty());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_config("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.yaml"));
    }
}
