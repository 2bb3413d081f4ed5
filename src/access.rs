use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::warn;

/// Deployment environment the admin policy is evaluated in.
///
/// Defaults to `Production`; development access must be asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Who is asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    SignedIn { user_id: String, roles: Vec<String> },
}

impl Identity {
    pub fn signed_in(user_id: impl Into<String>, roles: &[&str]) -> Self {
        Self::SignedIn {
            user_id: user_id.into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Decides who may use admin operations (create, resolve, link contracts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPolicy {
    pub environment: Environment,
    pub admin_role: String,
}

impl Default for AdminPolicy {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            admin_role: "admin".to_string(),
        }
    }
}

impl AdminPolicy {
    pub fn new(environment: Environment, admin_role: impl Into<String>) -> Self {
        Self {
            environment,
            admin_role: admin_role.into(),
        }
    }

    /// In development every signed-in user is an admin.
    pub fn is_admin(&self, identity: &Identity) -> bool {
        let Identity::SignedIn { user_id, roles } = identity else {
            return false;
        };

        if roles.iter().any(|r| r == &self.admin_role) {
            return true;
        }

        if self.environment == Environment::Development {
            warn!(user_id = %user_id, "Granting admin to user without the {} role (development)", self.admin_role);
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_never_admin() {
        for env in [Environment::Development, Environment::Production] {
            assert!(!AdminPolicy::new(env, "admin").is_admin(&Identity::Anonymous));
        }
    }

    #[test]
    fn test_production_requires_role() {
        let policy = AdminPolicy::new(Environment::Production, "admin");

        assert!(policy.is_admin(&Identity::signed_in("u1", &["admin"])));
        assert!(!policy.is_admin(&Identity::signed_in("u2", &["member"])));
        assert!(!policy.is_admin(&Identity::signed_in("u3", &[])));
    }

    #[test]
    fn test_development_grants_signed_in() {
        let policy = AdminPolicy::new(Environment::Development, "admin");

        assert!(policy.is_admin(&Identity::signed_in("u2", &["member"])));
    }

    #[test]
    fn test_default_requires_role() {
        let policy = AdminPolicy::default();

        assert_eq!(policy.environment, Environment::Production);
        assert!(!policy.is_admin(&Identity::signed_in("u2", &["member"])));
        assert!(policy.is_admin(&Identity::signed_in("u1", &["admin"])));
    }

    #[test]
    fn test_custom_role() {
        let policy = AdminPolicy::new(Environment::Production, "org:admin");

        assert!(policy.is_admin(&Identity::signed_in("u1", &["org:admin"])));
        assert!(!policy.is_admin(&Identity::signed_in("u1", &["admin"])));
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("prod".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("Development".parse::<Environment>(), Ok(Environment::Development));
        assert!("staging".parse::<Environment>().is_err());
    }
}
