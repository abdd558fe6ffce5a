//
//  config.rs
//  ifcprune
//

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Filtering policy configuration.
///
/// Loaded from TOML, falling back to defaults for any missing field. All
/// type names are compared case-insensitively; they are normalized to
/// uppercase on use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Entity types always retained regardless of the user's selection.
    #[serde(default = "default_skeleton_types")]
    pub skeleton_types: Vec<String>,

    /// Types that count as spatial containers when re-deriving containment
    /// on the constructive path.
    #[serde(default = "default_spatial_types")]
    pub spatial_types: Vec<String>,

    /// Fallback container type when no spatial ancestor is found.
    #[serde(default = "default_container_type")]
    pub default_container_type: String,

    /// When true, a requested keep-type also matches every present type
    /// whose name extends it (IFCWALL matches IFCWALLSTANDARDCASE).
    /// Off by default: supertype and subtype must be listed explicitly.
    #[serde(default)]
    pub expand_subtypes: bool,
}

fn default_skeleton_types() -> Vec<String> {
    vec![
        "IFCPROJECT".to_string(),
        "IFCSITE".to_string(),
        "IFCBUILDING".to_string(),
        "IFCBUILDINGSTOREY".to_string(),
        "IFCSPACE".to_string(),
    ]
}

fn default_spatial_types() -> Vec<String> {
    vec![
        "IFCSITE".to_string(),
        "IFCBUILDING".to_string(),
        "IFCBUILDINGSTOREY".to_string(),
        "IFCSPACE".to_string(),
    ]
}

fn default_container_type() -> String {
    "IFCBUILDING".to_string()
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            skeleton_types: default_skeleton_types(),
            spatial_types: default_spatial_types(),
            default_container_type: default_container_type(),
            expand_subtypes: false,
        }
    }
}

impl FilterConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Skeleton types as an uppercase set.
    pub fn skeleton_set(&self) -> BTreeSet<String> {
        self.skeleton_types
            .iter()
            .map(|t| t.to_ascii_uppercase())
            .collect()
    }

    /// Spatial container types as an uppercase set.
    pub fn spatial_set(&self) -> BTreeSet<String> {
        self.spatial_types
            .iter()
            .map(|t| t.to_ascii_uppercase())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = FilterConfig::default();
        assert!(cfg.skeleton_set().contains("IFCBUILDINGSTOREY"));
        assert!(!cfg.spatial_set().contains("IFCPROJECT"));
        assert!(!cfg.expand_subtypes);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: FilterConfig = toml::from_str("expand_subtypes = true").unwrap();
        assert!(cfg.expand_subtypes);
        assert_eq!(cfg.default_container_type, "IFCBUILDING");
        assert_eq!(cfg.skeleton_types.len(), 5);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let cfg = FilterConfig::load(Path::new("/nonexistent/ifcprune.toml"));
        assert_eq!(cfg.default_container_type, "IFCBUILDING");
    }

    #[test]
    fn test_skeleton_set_normalizes_case() {
        let cfg: FilterConfig =
            toml::from_str(r#"skeleton_types = ["IfcProject", "ifcbuilding"]"#).unwrap();
        assert!(cfg.skeleton_set().contains("IFCPROJECT"));
        assert!(cfg.skeleton_set().contains("IFCBUILDING"));
    }
}
