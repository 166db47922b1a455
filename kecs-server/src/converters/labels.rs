//! Tag/label/annotation sanitization, shared by every converter.
//!
//! Kubernetes label values are far more restrictive than ECS tag values
//! (63 chars, `[A-Za-z0-9._-]`), so tags map to *both* a sanitized label
//! and a full-fidelity annotation (spec 4.2).

use kecs_definitions::structs::Tag;
use std::collections::BTreeMap;

const MAX_LABEL_LEN: usize = 63;

/// Replace any character outside `[A-Za-z0-9._-]` with `-` and truncate to
/// 63 characters, matching Kubernetes label-value constraints.
pub fn sanitize_label_value(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    sanitized.chars().take(MAX_LABEL_LEN).collect()
}

/// `kecs.io/service`, `kecs.io/cluster`, `kecs.io/task-definition` plus
/// any tags, all sanitized for use as Pod/Deployment labels.
pub fn service_pod_labels(
    cluster_name: &str,
    service_name: &str,
    family_revision: &str,
    tags: &[Tag],
) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("kecs.io/service".to_string(), sanitize_label_value(service_name));
    labels.insert("kecs.io/cluster".to_string(), sanitize_label_value(cluster_name));
    labels.insert(
        "kecs.io/task-definition".to_string(),
        sanitize_label_value(family_revision),
    );
    for tag in tags {
        labels.insert(format!("kecs.io/tag-{}", sanitize_label_value(&tag.key)), sanitize_label_value(&tag.value));
    }
    labels
}

/// Tags keep full fidelity as annotations (no length/charset restriction).
pub fn tags_to_annotations(tags: &[Tag]) -> BTreeMap<String, String> {
    tags.iter()
        .map(|t| (format!("kecs.io/tag/{}", t.key), t.value.clone()))
        .collect()
}

pub fn tags_to_labels(tags: &[Tag]) -> BTreeMap<String, String> {
    tags.iter()
        .map(|t| (format!("kecs.io/tag-{}", sanitize_label_value(&t.key)), sanitize_label_value(&t.value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_disallowed_characters() {
        assert_eq!(sanitize_label_value("team:payments"), "team-payments");
    }

    #[test]
    fn truncates_to_63_chars() {
        let long = "a".repeat(100);
        assert_eq!(sanitize_label_value(&long).len(), MAX_LABEL_LEN);
    }

    #[test]
    fn annotations_keep_full_fidelity() {
        let tags = vec![Tag {
            key: "owner".into(),
            value: "team:payments (east)".into(),
        }];
        let ann = tags_to_annotations(&tags);
        assert_eq!(ann.get("kecs.io/tag/owner").unwrap(), "team:payments (east)");
    }
}
