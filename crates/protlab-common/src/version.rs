//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the simulation runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use serde::Serialize;

/// Build metadata surfaced by `--version` flags.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub package: &'static str,
    pub version: &'static str,
    /// Optional commit id injected by CI through `PROTLAB_GIT_SHA`.
    pub git_sha: Option<&'static str>,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            package: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            git_sha: option_env!("PROTLAB_GIT_SHA"),
        }
    }

    pub fn short(&self) -> String {
        format!("protlab {}", self.version)
    }

    pub fn extended(&self) -> String {
        match self.git_sha {
            Some(sha) => format!("protlab {} ({}, commit {})", self.version, self.package, sha),
            None => format!("protlab {} ({})", self.version, self.package),
        }
    }
}
