//
//  select.rs
//  ifcprune
//

use std::collections::BTreeSet;

use crate::config::FilterConfig;
use crate::model::GraphModel;

/// Authoritative keep/remove partition of the type space.
#[derive(Debug, Clone)]
pub struct TypePartition {
    /// Requested types plus the skeleton, uppercase.
    pub keep: BTreeSet<String>,
    /// Every type present in the graph that is not kept.
    pub remove: BTreeSet<String>,
    /// Requested names that matched zero entities. Not an error: they
    /// simply contribute nothing, but the caller reports them.
    pub unmatched: Vec<String>,
}

/// Resolve the user's keep-type request against the graph.
///
/// Matching is exact on the uppercase type tag; no implicit subtype
/// widening unless `expand_subtypes` is enabled, in which case a requested
/// name also matches present types extending it (IFCWALL matches
/// IFCWALLSTANDARDCASE). Skeleton types are always kept exactly as listed.
pub fn resolve(
    requested: &[String],
    config: &FilterConfig,
    graph: &GraphModel,
) -> TypePartition {
    let present = graph.types_present();

    let mut keep: BTreeSet<String> = config.skeleton_set();
    let mut unmatched = Vec::new();

    for name in requested {
        let name = name.trim().to_ascii_uppercase();
        if name.is_empty() {
            continue;
        }

        let mut matched = !graph.entities_of_type(&name).is_empty();
        if config.expand_subtypes {
            for ty in &present {
                if ty.starts_with(&name) && ty != &name {
                    keep.insert(ty.clone());
                    matched = true;
                }
            }
        }

        if !matched {
            unmatched.push(name.clone());
        }
        // Kept even when absent in the graph: the keep side is the union
        // of request and skeleton, not just what matched.
        keep.insert(name);
    }

    let remove = present
        .into_iter()
        .filter(|ty| !keep.contains(ty))
        .collect();

    TypePartition {
        keep,
        remove,
        unmatched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, EntityId};

    fn graph_with(types: &[&str]) -> GraphModel {
        let mut graph = GraphModel::new();
        for (i, ty) in types.iter().enumerate() {
            graph.insert(Entity::new(EntityId(i as u64 + 1), *ty, vec![]));
        }
        graph
    }

    #[test]
    fn test_skeleton_always_kept() {
        let graph = graph_with(&["IFCPROJECT", "IFCWALL", "IFCDOOR"]);
        let partition = resolve(&[], &FilterConfig::default(), &graph);

        assert!(partition.keep.contains("IFCPROJECT"));
        assert!(partition.remove.contains("IFCWALL"));
        assert!(partition.remove.contains("IFCDOOR"));
    }

    #[test]
    fn test_requested_union_skeleton() {
        let graph = graph_with(&["IFCPROJECT", "IFCWALL", "IFCDOOR"]);
        let partition = resolve(
            &["IfcWall".to_string()],
            &FilterConfig::default(),
            &graph,
        );

        assert!(partition.keep.contains("IFCWALL"));
        assert_eq!(
            partition.remove.iter().collect::<Vec<_>>(),
            vec!["IFCDOOR"]
        );
        assert!(partition.unmatched.is_empty());
    }

    #[test]
    fn test_unknown_type_is_warning_not_error() {
        let graph = graph_with(&["IFCWALL"]);
        let partition = resolve(
            &["IfcChimney".to_string()],
            &FilterConfig::default(),
            &graph,
        );
        assert_eq!(partition.unmatched, vec!["IFCCHIMNEY".to_string()]);
        // Still part of keep: it simply matches nothing.
        assert!(partition.keep.contains("IFCCHIMNEY"));
    }

    #[test]
    fn test_no_implicit_subtype_widening() {
        let graph = graph_with(&["IFCWALL", "IFCWALLSTANDARDCASE"]);
        let partition = resolve(
            &["IfcWall".to_string()],
            &FilterConfig::default(),
            &graph,
        );
        assert!(partition.remove.contains("IFCWALLSTANDARDCASE"));
    }

    #[test]
    fn test_subtype_expansion_policy() {
        let graph = graph_with(&["IFCWALL", "IFCWALLSTANDARDCASE", "IFCDOOR"]);
        let config = FilterConfig {
            expand_subtypes: true,
            ..FilterConfig::default()
        };
        let partition = resolve(&["IfcWall".to_string()], &config, &graph);

        assert!(partition.keep.contains("IFCWALLSTANDARDCASE"));
        assert!(partition.remove.contains("IFCDOOR"));
    }

    #[test]
    fn test_blank_request_entries_skipped() {
        let graph = graph_with(&["IFCWALL"]);
        let partition = resolve(
            &[" ".to_string(), "IfcWall".to_string()],
            &FilterConfig::default(),
            &graph,
        );
        assert!(partition.keep.contains("IFCWALL"));
        assert!(partition.unmatched.is_empty());
    }
}
