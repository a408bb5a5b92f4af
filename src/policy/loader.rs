//! Layered policy loading: structured file first, environment second

use super::{
    to_set, Policy, DEFAULT_ADMIN_OPERATIONS, DEFAULT_SELF_SERVICE_OPERATIONS,
    DEFAULT_USER_OPERATIONS,
};
use crate::config::{parse_bool, parse_list};
use crate::error::Result;
use serde::Deserialize;
use std::path::Path;

/// On-disk shape of the policy file
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyFile {
    #[serde(default = "default_true", alias = "rbac_enabled")]
    pub enabled: bool,
    #[serde(default, alias = "admin_identities")]
    pub admin_users: Vec<String>,
    #[serde(default)]
    pub admin_groups: Vec<String>,
    #[serde(default)]
    pub admin_operations: Vec<String>,
    #[serde(default)]
    pub user_operations: Vec<String>,
    #[serde(default)]
    pub self_service_operations: Vec<String>,
    #[serde(default = "default_true", alias = "notify_on_denied")]
    pub notify_admin_on_denied: bool,
    #[serde(default = "default_true")]
    pub log_access_attempts: bool,
}

fn default_true() -> bool {
    true
}

impl From<PolicyFile> for Policy {
    fn from(file: PolicyFile) -> Self {
        Policy {
            enabled: file.enabled,
            admin_identities: to_set(&file.admin_users),
            admin_groups: to_set(&file.admin_groups),
            admin_operations: to_set(&file.admin_operations),
            user_operations: to_set(&file.user_operations),
            self_service_operations: to_set(&file.self_service_operations),
            notify_on_denied: file.notify_admin_on_denied,
            log_access_attempts: file.log_access_attempts,
        }
    }
}

/// Read a policy file; the format follows the file extension
pub fn from_file(path: &Path) -> Result<Policy> {
    let file: PolicyFile = ::config::Config::builder()
        .add_source(::config::File::from(path))
        .build()?
        .try_deserialize()?;
    Ok(file.into())
}

/// Build a policy from environment-style keys
pub fn from_lookup<F>(lookup: F) -> Policy
where
    F: Fn(&str) -> Option<String>,
{
    let list_or = |key: &str, defaults: &[&str]| match lookup(key) {
        Some(value) => to_set(&parse_list(&value)),
        None => to_set(defaults),
    };

    Policy {
        enabled: parse_bool(lookup("RBAC_ENABLED").as_deref(), true),
        admin_identities: list_or("ADMIN_USERS", &[]),
        admin_groups: list_or("ADMIN_GROUPS", &[]),
        admin_operations: list_or("ADMIN_OPERATIONS", DEFAULT_ADMIN_OPERATIONS),
        user_operations: list_or("USER_OPERATIONS", DEFAULT_USER_OPERATIONS),
        self_service_operations: list_or("SELF_SERVICE_OPERATIONS", DEFAULT_SELF_SERVICE_OPERATIONS),
        notify_on_denied: parse_bool(lookup("RBAC_NOTIFY_ADMIN_ON_DENIED").as_deref(), true),
        log_access_attempts: parse_bool(lookup("RBAC_LOG_ACCESS_ATTEMPTS").as_deref(), true),
    }
}

/// Load the policy, never failing.
///
/// A present file wins over the environment. A file that cannot be read or
/// parsed yields [`Policy::fail_closed`].
pub fn load_policy<F>(path: &Path, lookup: F) -> Policy
where
    F: Fn(&str) -> Option<String>,
{
    if !path.exists() {
        let policy = from_lookup(lookup);
        tracing::info!(
            path = %path.display(),
            "RBAC configuration loaded from environment variables"
        );
        return policy;
    }

    match from_file(path) {
        Ok(policy) => {
            tracing::info!(path = %path.display(), "RBAC configuration loaded from config file");
            policy
        }
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "Error loading RBAC configuration, using fail-closed defaults"
            );
            Policy::fail_closed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn temp_policy(ext: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("opsgate-policy-{}.{}", uuid::Uuid::new_v4(), ext));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_toml_file_is_loaded() {
        let path = temp_policy(
            "toml",
            r#"
enabled = true
admin_users = ["U1234567890", "@david.murphy", "john.doe"]
admin_groups = ["dba-team"]
admin_operations = ["create_cluster"]
user_operations = ["list_clusters", "help"]
self_service_operations = ["add_ip_whitelist"]
notify_admin_on_denied = false
"#,
        );

        let policy = load_policy(&path, no_env);
        std::fs::remove_file(&path).ok();

        assert!(policy.enabled);
        assert_eq!(
            policy.admin_identities,
            to_set(&["U1234567890", "@david.murphy", "john.doe"])
        );
        assert_eq!(policy.admin_groups, to_set(&["dba-team"]));
        assert_eq!(policy.admin_operations, to_set(&["create_cluster"]));
        assert!(!policy.notify_on_denied);
        assert!(policy.log_access_attempts);
    }

    #[test]
    fn test_json_file_missing_fields_default() {
        let path = temp_policy("json", r#"{"admin_groups": ["devops-team"]}"#);

        let policy = load_policy(&path, no_env);
        std::fs::remove_file(&path).ok();

        assert!(policy.enabled);
        assert!(policy.admin_identities.is_empty());
        assert!(policy.user_operations.is_empty());
        assert_eq!(policy.admin_groups, to_set(&["devops-team"]));
    }

    #[test]
    fn test_file_wins_over_environment() {
        let path = temp_policy("toml", "enabled = true\nadmin_users = [\"@alice\"]\n");
        let env = |key: &str| match key {
            "RBAC_ENABLED" => Some("false".to_string()),
            "ADMIN_USERS" => Some("@mallory".to_string()),
            _ => None,
        };

        let policy = load_policy(&path, env);
        std::fs::remove_file(&path).ok();

        assert!(policy.enabled);
        assert_eq!(policy.admin_identities, to_set(&["@alice"]));
    }

    #[test]
    fn test_unparseable_file_fails_closed() {
        let path = temp_policy("toml", "enabled = \"sometimes\"\nadmin_users = [");

        let policy = load_policy(&path, no_env);
        std::fs::remove_file(&path).ok();

        assert_eq!(policy, Policy::fail_closed());
    }

    #[test]
    fn test_missing_file_falls_back_to_environment() {
        let env: HashMap<&str, &str> = [
            ("RBAC_ENABLED", "true"),
            ("ADMIN_USERS", "U1234567890,@jane.smith"),
            ("ADMIN_GROUPS", "dba-team"),
            ("RBAC_NOTIFY_ADMIN_ON_DENIED", "false"),
        ]
        .into_iter()
        .collect();

        let policy = load_policy(Path::new("/nonexistent/opsgate/rbac.toml"), |key| {
            env.get(key).map(|v| v.to_string())
        });

        assert_eq!(
            policy.admin_identities,
            to_set(&["U1234567890", "@jane.smith"])
        );
        assert_eq!(policy.admin_groups, to_set(&["dba-team"]));
        assert_eq!(policy.admin_operations, to_set(DEFAULT_ADMIN_OPERATIONS));
        assert_eq!(policy.user_operations, to_set(DEFAULT_USER_OPERATIONS));
        assert!(!policy.notify_on_denied);
        assert!(policy.log_access_attempts);
    }

    #[test]
    fn test_empty_environment_is_secure_default() {
        let policy = from_lookup(no_env);
        assert_eq!(policy, Policy::default());
    }

    #[test]
    fn test_environment_operation_overrides() {
        let policy = from_lookup(|key| match key {
            "USER_OPERATIONS" => Some("help".to_string()),
            "SELF_SERVICE_OPERATIONS" => Some(String::new()),
            _ => None,
        });

        assert_eq!(policy.user_operations, to_set(&["help"]));
        assert!(policy.self_service_operations.is_empty());
    }

    #[test]
    fn test_unrecognized_rbac_enabled_keeps_rbac_on() {
        assert!(!from_lookup(|k| (k == "RBAC_ENABLED").then(|| "False".to_string())).enabled);
        assert!(from_lookup(|k| (k == "RBAC_ENABLED").then(|| "nope".to_string())).enabled);
    }
}
