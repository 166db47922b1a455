//! Shared ARN → Kubernetes-Secret-name derivation.
//!
//! Used by both the pod-spec converter (to build `secretKeyRef`s) and the
//! Secrets Manager/SSM integrations (to create/update the matching
//! Kubernetes `Secret`), so the two sides always agree on a name.
//!
//! Spec 4.6: "lowercasing, replacing non-`[a-z0-9-]` with `-`, collapsing
//! repeats, prefixing `sm-`/`ssm-`, trimming trailing version suffix."

/// `valueFrom` ARN parsed into `(resource_identifier, optional_json_key)`.
///
/// For Secrets Manager, ECS allows an optional `:jsonKey` suffix after the
/// secret name segment: `arn:aws:secretsmanager:<region>:<acct>:secret:<name>:<jsonKey>::<version-stage>:<version-id>`.
/// SSM parameter ARNs carry no json key.
pub fn parse_value_from(value_from: &str) -> (String, Option<String>) {
    let parts: Vec<&str> = value_from.split(':').collect();
    // arn:aws:<service>:<region>:<account>:<resource-type>:<rest...>
    if parts.len() >= 7 && parts[0] == "arn" {
        let resource_type = parts[5];
        if resource_type == "secret" {
            let name = parts[6].to_string();
            let json_key = parts.get(7).filter(|s| !s.is_empty()).map(|s| s.to_string());
            return (name, json_key);
        }
        if resource_type.starts_with("parameter") {
            // ssm ARNs use `parameter/<name>` as a single resource segment
            // rather than a further colon-separated field.
            let name = resource_type
                .strip_prefix("parameter/")
                .unwrap_or(resource_type)
                .to_string();
            return (name, None);
        }
    }
    (value_from.to_string(), None)
}

fn sanitize(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut last_was_dash = false;
    for c in lower.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' };
        if c == '-' && last_was_dash {
            continue;
        }
        last_was_dash = c == '-';
        out.push(c);
    }
    out.trim_matches('-').to_string()
}

/// Trims a trailing `-<6-char-suffix>` AWS appends to generated secret
/// names (e.g. `db-pw-A1b2C3`), since that suffix is backend-assigned and
/// would otherwise make the Kubernetes Secret name churn across syncs.
fn trim_version_suffix(name: &str) -> &str {
    if let Some(idx) = name.rfind('-') {
        let suffix = &name[idx + 1..];
        if suffix.len() == 6 && suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return &name[..idx];
        }
    }
    name
}

pub fn secrets_manager_secret_name(value_from: &str) -> String {
    let (name, _) = parse_value_from(value_from);
    format!("sm-{}", sanitize(trim_version_suffix(&name)))
}

pub fn ssm_secret_name(value_from: &str) -> String {
    let (name, _) = parse_value_from(value_from);
    format!("ssm-{}", sanitize(trim_version_suffix(&name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_manager_name_derivation() {
        let arn = "arn:aws:secretsmanager:us-east-1:000000000000:secret:db-pw-A1b2C3";
        assert_eq!(secrets_manager_secret_name(arn), "sm-db-pw");
    }

    #[test]
    fn json_key_suffix_is_parsed_separately() {
        let arn = "arn:aws:secretsmanager:us-east-1:000000000000:secret:db-creds-A1b2C3:password";
        let (name, key) = parse_value_from(arn);
        assert_eq!(name, "db-creds-A1b2C3");
        assert_eq!(key.as_deref(), Some("password"));
    }

    #[test]
    fn ssm_name_derivation() {
        let arn = "arn:aws:ssm:us-east-1:000000000000:parameter/prod/db/password";
        assert_eq!(ssm_secret_name(arn), "ssm-prod-db-password");
    }

    #[test]
    fn collapses_repeated_separators() {
        assert_eq!(sanitize("foo__bar..baz"), "foo-bar-baz");
    }
}
