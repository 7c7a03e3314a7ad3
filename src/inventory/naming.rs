/// Replace every character that is not a word character with `_`.
pub fn sanitize_group_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Group name for a host: trailing `-<digits>` dropped, postfix appended, sanitized.
pub fn host_group_name(hostname: &str, postfix: Option<&str>) -> String {
    let mut group = strip_index_suffix(hostname).to_string();
    if let Some(postfix) = postfix {
        group.push_str(postfix);
    }
    sanitize_group_name(&group)
}

fn strip_index_suffix(hostname: &str) -> &str {
    let without_digits = hostname.trim_end_matches(|c: char| c.is_ascii_digit());
    match without_digits.strip_suffix('-') {
        Some(stripped) => stripped,
        None => hostname,
    }
}

/// `label_<key>_<value>`, sanitized.
pub fn label_group_name(key: &str, value: &str) -> String {
    sanitize_group_name(&format!("label_{key}_{value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_group_name() {
        for case in [
            "test group name 01",
            "test.group.name.01",
            "test+group+name+01",
            "test-group-name-01",
        ] {
            assert_eq!(sanitize_group_name(case), "test_group_name_01");
        }
    }

    #[test]
    fn test_host_group_name_with_postfixes() {
        for (postfix, expected) in [
            (None, "test_host"),
            (Some(""), "test_host"),
            (Some("_group"), "test_host_group"),
        ] {
            for case in ["test-host-01", "test.host-02", "test-host-03"] {
                assert_eq!(host_group_name(case, postfix), expected, "{case}");
            }
        }
    }

    #[test]
    fn test_host_group_name_keeps_non_index_suffix() {
        assert_eq!(host_group_name("db01", None), "db01");
        assert_eq!(host_group_name("web-a", Some("-hosts")), "web_a_hosts");
        assert_eq!(host_group_name("cache-", None), "cache");
    }

    #[test]
    fn test_label_group_name() {
        assert_eq!(label_group_name("env", "prod-eu"), "label_env_prod_eu");
    }
}
