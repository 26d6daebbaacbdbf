use crate::model::{Link, LinkDirection};
use crate::sync::normalize::{LinkDescriptor, LinkTarget, LinkTypeInfo};

/// Expand link descriptors into directed [`Link`] rows for `source_key`.
///
/// Each descriptor yields one row per side present, inward before outward.
/// The direction label comes from the link type's label for that side.
pub fn resolve_links(source_key: &str, descriptors: &[LinkDescriptor]) -> Vec<Link> {
    let mut links = Vec::new();
    for descriptor in descriptors {
        if let Some(target) = &descriptor.inward {
            links.push(build_link(
                source_key,
                &descriptor.link_type,
                LinkDirection::Inward,
                target,
            ));
        }
        if let Some(target) = &descriptor.outward {
            links.push(build_link(
                source_key,
                &descriptor.link_type,
                LinkDirection::Outward,
                target,
            ));
        }
    }
    links
}

fn build_link(
    source_key: &str,
    link_type: &LinkTypeInfo,
    direction: LinkDirection,
    target: &LinkTarget,
) -> Link {
    let direction_label = match direction {
        LinkDirection::Inward => link_type.inward.clone(),
        LinkDirection::Outward => link_type.outward.clone(),
    };
    Link {
        source_issue_key: source_key.to_string(),
        target_issue_key: target.key.clone(),
        link_type: link_type.id.clone(),
        link_type_name: link_type.name.clone(),
        direction,
        direction_label,
        target_summary: target.summary.clone(),
        target_status: target.status.clone(),
        target_priority: target.priority.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks() -> LinkTypeInfo {
        LinkTypeInfo {
            id: Some("10000".to_string()),
            name: Some("Blocks".to_string()),
            inward: Some("is blocked by".to_string()),
            outward: Some("blocks".to_string()),
        }
    }

    fn target(key: &str) -> LinkTarget {
        LinkTarget {
            key: key.to_string(),
            summary: Some(format!("Summary of {key}")),
            status: Some("Открыто".to_string()),
            priority: None,
        }
    }

    #[test]
    fn test_descriptor_with_both_sides_yields_two_links() {
        let descriptor = LinkDescriptor {
            link_type: blocks(),
            inward: Some(target("DW-2")),
            outward: Some(target("DW-3")),
        };
        let links = resolve_links("DW-1", &[descriptor]);

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].direction, LinkDirection::Inward);
        assert_eq!(links[0].target_issue_key, "DW-2");
        assert_eq!(links[0].direction_label.as_deref(), Some("is blocked by"));
        assert_eq!(links[1].direction, LinkDirection::Outward);
        assert_eq!(links[1].target_issue_key, "DW-3");
        assert_eq!(links[1].direction_label.as_deref(), Some("blocks"));
        assert!(links.iter().all(|l| l.source_issue_key == "DW-1"));
        assert!(links.iter().all(|l| l.link_type_name.as_deref() == Some("Blocks")));
    }

    #[test]
    fn test_snapshot_fields_are_copied() {
        let descriptor = LinkDescriptor {
            link_type: blocks(),
            inward: None,
            outward: Some(target("DW-3")),
        };
        let links = resolve_links("DW-1", &[descriptor]);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].link_type.as_deref(), Some("10000"));
        assert_eq!(links[0].target_summary.as_deref(), Some("Summary of DW-3"));
        assert_eq!(links[0].target_status.as_deref(), Some("Открыто"));
        assert_eq!(links[0].target_priority, None);
    }

    #[test]
    fn test_partial_type_still_creates_link() {
        let descriptor = LinkDescriptor {
            link_type: LinkTypeInfo::default(),
            inward: Some(LinkTarget {
                key: "OPS-1".to_string(),
                summary: None,
                status: None,
                priority: None,
            }),
            outward: None,
        };
        let links = resolve_links("DW-1", &[descriptor]);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].direction_label, None);
        assert_eq!(links[0].link_type, None);
    }

    #[test]
    fn test_descriptor_without_targets_yields_nothing() {
        let descriptor = LinkDescriptor {
            link_type: blocks(),
            inward: None,
            outward: None,
        };
        assert!(resolve_links("DW-1", &[descriptor]).is_empty());
        assert!(resolve_links("DW-1", &[]).is_empty());
    }
}
