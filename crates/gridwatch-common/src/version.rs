//! ---
//! gw_section: "01-core-functionality"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Shared primitives and utilities for the monitoring runtime."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

/// Build metadata surfaced through the CLI and the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub semver: String,
    pub profile: String,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            semver: env!("CARGO_PKG_VERSION").to_owned(),
            profile: if cfg!(debug_assertions) {
                "debug".to_owned()
            } else {
                "release".to_owned()
            },
        }
    }

    /// Short form used in log lines and `--version` output.
    pub fn cli_string(&self) -> String {
        format!("v{}", self.semver)
    }

    /// Extended form for `-V` output.
    pub fn extended(&self) -> String {
        format!("GridWatch v{} ({})", self.semver, self.profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_string_is_prefixed() {
        let version = VersionInfo::current();
        assert!(version.cli_string().starts_with('v'));
        assert!(version.extended().contains(&version.semver));
    }
}
