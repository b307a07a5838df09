use crate::types::LockingPolicy;

/// Environment variable overriding the application identifier.
pub const ENV_APPLICATION_ID: &str = "MYO_APPLICATION_ID";
/// Environment variable selecting the locking policy (`none` | `standard`).
pub const ENV_LOCKING_POLICY: &str = "MYO_LOCKING_POLICY";

/// Hub construction settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Reverse-domain identifier, e.g. `com.example.app`.
    pub application_id: String,
    /// Applied right after the hub is allocated. `None` keeps the engine default.
    pub locking_policy: Option<LockingPolicy>,
}

impl HubConfig {
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            locking_policy: None,
        }
    }

    pub fn with_locking_policy(mut self, policy: LockingPolicy) -> Self {
        self.locking_policy = Some(policy);
        self
    }

    /// Build a config from `default_app_id`, then apply `MYO_*` overrides.
    pub fn from_env(default_app_id: &str) -> Self {
        Self::from_lookup(default_app_id, |name| std::env::var(name).ok())
    }

    fn from_lookup(default_app_id: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let application_id = lookup(ENV_APPLICATION_ID)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default_app_id.to_string());

        let locking_policy = lookup(ENV_LOCKING_POLICY)
            .filter(|v| !v.trim().is_empty())
            .and_then(|v| {
                let policy = LockingPolicy::parse(&v);
                if policy.is_none() {
                    log::warn!(
                        "Unknown {}='{}', ignoring (supported: none|standard)",
                        ENV_LOCKING_POLICY,
                        v
                    );
                }
                policy
            });

        Self {
            application_id,
            locking_policy,
        }
    }
}
