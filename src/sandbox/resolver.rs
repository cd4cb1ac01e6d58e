// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Module resolution for `require` inside the sandbox.
//!
//! Built-in module ids are checked against the built-in allow-list, every other
//! id against the external allow-list. A module that is not permitted is never
//! loaded, not even partially. The resolver is immutable once built and shared
//! by every sandbox of the process; loaded modules are cached per sandbox only.

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{AllowList, SandboxConfig};
use crate::errors::ConfigError;
use crate::observability::messages::sandbox::{ModuleDenied, ModuleNotFound};
use crate::observability::messages::StructuredLog;

/// Ids of the built-in modules of the Node.js runtime.
///
/// Only some of them are hosted (see [`HOSTED_BUILTINS`]); the rest can be
/// permitted but resolve to "not found".
pub const BUILTIN_MODULE_IDS: &[&str] = &[
    "assert", "async_hooks", "buffer", "child_process", "cluster", "console", "constants",
    "crypto", "dgram", "diagnostics_channel", "dns", "domain", "events", "fs", "http", "http2",
    "https", "inspector", "module", "net", "os", "path", "perf_hooks", "process", "punycode",
    "querystring", "readline", "repl", "stream", "string_decoder", "sys", "timers", "tls",
    "trace_events", "tty", "url", "util", "v8", "vm", "wasi", "worker_threads", "zlib",
];

const NODE_PREFIX: &str = "node:";

/// Built-in modules whose CommonJS source ships with the runner.
const HOSTED_BUILTINS: &[(&str, &str)] = &[
    ("assert", include_str!("js/modules/assert.js")),
    ("buffer", include_str!("js/modules/buffer.js")),
    ("events", include_str!("js/modules/events.js")),
    ("path", include_str!("js/modules/path.js")),
    ("querystring", include_str!("js/modules/querystring.js")),
    ("util", include_str!("js/modules/util.js")),
];

/// A module the sandbox may evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModule {
    /// Cache key inside the sandbox; the canonical id.
    pub key: String,
    pub source: Arc<str>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// The allow-lists do not permit the module.
    #[error("Cannot find module '{0}'")]
    Denied(String),

    /// The module is permitted but this runner does not provide it.
    #[error("Cannot find module '{0}'")]
    NotFound(String),
}

/// Classification of a requested id.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ModuleId<'a> {
    /// A built-in: the canonical root id and the id as written.
    Builtin { root: &'a str, requested: &'a str },
    External(&'a str),
}

fn classify(module_id: &str) -> ModuleId<'_> {
    let bare = module_id.strip_prefix(NODE_PREFIX).unwrap_or(module_id);
    let root = bare.split('/').next().unwrap_or(bare);
    if BUILTIN_MODULE_IDS.contains(&root) || module_id.starts_with(NODE_PREFIX) {
        ModuleId::Builtin {
            root,
            requested: bare,
        }
    } else {
        ModuleId::External(module_id)
    }
}

/// Whether `module_id` names a built-in module (with or without `node:`).
pub fn is_builtin(module_id: &str) -> bool {
    matches!(classify(module_id), ModuleId::Builtin { .. })
}

/// Resolves module ids against the allow-lists and the module registry.
#[derive(Debug, Default)]
pub struct ModuleResolver {
    builtin: AllowList,
    external: AllowList,
    hosted: BTreeMap<String, Arc<str>>,
    externals: BTreeMap<String, Arc<str>>,
}

impl ModuleResolver {
    /// A resolver with the hosted built-ins and no external modules.
    pub fn new(builtin: AllowList, external: AllowList) -> Self {
        let hosted = HOSTED_BUILTINS
            .iter()
            .map(|(id, source)| (id.to_string(), Arc::from(*source)))
            .collect();
        Self {
            builtin,
            external,
            hosted,
            externals: BTreeMap::new(),
        }
    }

    /// Build a resolver from configuration, reading external module sources.
    pub fn from_config(config: &SandboxConfig) -> Result<Self, ConfigError> {
        let mut resolver = Self::new(config.builtin_allow_list(), config.external_allow_list());
        for (module_id, path) in &config.external_modules {
            let source = fs::read_to_string(path).map_err(|source| ConfigError::ModuleSource {
                module_id: module_id.clone(),
                path: path.clone(),
                source,
            })?;
            resolver = resolver.with_external(module_id, source)?;
        }
        Ok(resolver)
    }

    /// Register the CommonJS source of an external module.
    pub fn with_external(
        mut self,
        module_id: impl Into<String>,
        source: impl Into<Arc<str>>,
    ) -> Result<Self, ConfigError> {
        let module_id = module_id.into();
        if is_builtin(&module_id) {
            return Err(ConfigError::ShadowsBuiltin(module_id));
        }
        self.externals.insert(module_id, source.into());
        Ok(self)
    }

    pub fn resolve(&self, module_id: &str) -> Result<ResolvedModule, ResolveError> {
        let (permitted, key, source) = match classify(module_id) {
            ModuleId::Builtin { root, requested } => {
                let permitted = self.builtin.permits(module_id)
                    || self.builtin.permits(requested)
                    || self.builtin.permits(root);
                // Sub-paths such as `path/posix` map onto the hosted root module.
                (permitted, root.to_string(), self.hosted.get(root))
            }
            ModuleId::External(id) => {
                let root = external_root(id);
                let permitted = self.external.permits(id) || self.external.permits(root);
                (permitted, id.to_string(), self.externals.get(id))
            }
        };

        if !permitted {
            ModuleDenied { module_id }.log();
            return Err(ResolveError::Denied(module_id.to_string()));
        }

        match source {
            Some(source) => Ok(ResolvedModule {
                key,
                source: Arc::clone(source),
            }),
            None => {
                ModuleNotFound { module_id }.log();
                Err(ResolveError::NotFound(module_id.to_string()))
            }
        }
    }
}

/// Package name of an external id: `@scope/pkg/sub` -> `@scope/pkg`, `pkg/sub` -> `pkg`.
fn external_root(module_id: &str) -> &str {
    let mut slashes = module_id.match_indices('/').map(|(i, _)| i);
    let cut = if module_id.starts_with('@') {
        slashes.nth(1)
    } else {
        slashes.next()
    };
    match cut {
        Some(i) => &module_id[..i],
        None => module_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn resolver(builtin: &str, external: &str) -> ModuleResolver {
        ModuleResolver::new(builtin.parse().unwrap(), external.parse().unwrap())
    }

    #[test]
    fn test_nothing_is_permitted_by_default() {
        let resolver = ModuleResolver::new(AllowList::none(), AllowList::none());
        assert_eq!(
            resolver.resolve("path"),
            Err(ResolveError::Denied("path".to_string()))
        );
        assert_eq!(
            resolver.resolve("disallowed-module"),
            Err(ResolveError::Denied("disallowed-module".to_string()))
        );
    }

    #[test]
    fn test_denied_message_names_the_module() {
        let err = resolver("", "").resolve("fs").unwrap_err();
        assert_eq!(err.to_string(), "Cannot find module 'fs'");
    }

    #[test]
    fn test_permitted_hosted_builtin_resolves() {
        let module = resolver("path", "").resolve("path").unwrap();
        assert_eq!(module.key, "path");
        assert!(module.source.contains("module.exports"));
    }

    #[test]
    fn test_node_prefix_and_sub_paths() {
        let resolver = resolver("path", "");
        assert_eq!(resolver.resolve("node:path").unwrap().key, "path");
        assert_eq!(resolver.resolve("path/posix").unwrap().key, "path");
        assert!(matches!(resolver.resolve("node:fs"), Err(ResolveError::Denied(_))));
    }

    #[test]
    fn test_builtin_list_does_not_cover_externals() {
        let resolver = resolver("*", "");
        assert!(resolver.resolve("util").is_ok());
        assert!(matches!(resolver.resolve("lodash"), Err(ResolveError::Denied(_))));
    }

    #[test]
    fn test_permitted_but_unhosted_builtin_is_not_found() {
        let err = resolver("fs", "").resolve("fs").unwrap_err();
        assert_eq!(err, ResolveError::NotFound("fs".to_string()));
    }

    #[test]
    fn test_external_module_registration() {
        let resolver = resolver("", "greeter, @acme/tools")
            .with_external("greeter", "module.exports = () => 'hi';")
            .unwrap();

        assert_eq!(resolver.resolve("greeter").unwrap().key, "greeter");
        assert!(matches!(
            resolver.resolve("@acme/tools/sub"),
            Err(ResolveError::NotFound(_))
        ));
        assert!(matches!(resolver.resolve("other"), Err(ResolveError::Denied(_))));
    }

    #[test]
    fn test_external_may_not_shadow_builtin() {
        let err = resolver("", "*").with_external("node:fs", "").unwrap_err();
        assert!(matches!(err, ConfigError::ShadowsBuiltin(id) if id == "node:fs"));
    }

    #[test]
    fn test_from_config_reads_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greeter.js");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "module.exports = {{ greet: (n) => 'hello ' + n }};").unwrap();

        let mut config = SandboxConfig::default();
        config.allowed_external_modules = Some("greeter".to_string());
        config.external_modules.insert("greeter".to_string(), path);

        let resolver = ModuleResolver::from_config(&config).unwrap();
        assert!(resolver.resolve("greeter").unwrap().source.contains("hello"));
    }

    #[test]
    fn test_from_config_reports_missing_source() {
        let mut config = SandboxConfig::default();
        config
            .external_modules
            .insert("ghost".to_string(), "/no/such/ghost.js".into());

        let err = ModuleResolver::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ModuleSource { ref module_id, .. } if module_id == "ghost"));
    }

    #[test]
    fn test_external_root() {
        assert_eq!(external_root("lodash/fp"), "lodash");
        assert_eq!(external_root("@scope/pkg/sub"), "@scope/pkg");
        assert_eq!(external_root("@scope/pkg"), "@scope/pkg");
        assert_eq!(external_root("moment"), "moment");
    }
}
