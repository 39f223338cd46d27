use std::sync::RwLock;

/// Source of the completion API key, queried on every request so rotated keys apply immediately.
pub trait Credentials: Send + Sync {
    fn api_key(&self) -> Option<String>;
}

/// Reads the key from an environment variable at call time.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Credentials for EnvCredentials {
    fn api_key(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

/// A key set at runtime, falling back to the environment until one is.
#[derive(Debug)]
pub struct RotatingCredentials {
    env: EnvCredentials,
    key: RwLock<Option<String>>,
}

impl RotatingCredentials {
    pub fn new(var: impl Into<String>) -> Self {
        Self {
            env: EnvCredentials::new(var),
            key: RwLock::new(None),
        }
    }

    pub fn var(&self) -> &str {
        self.env.var()
    }

    /// Replace the key used by every later request.
    pub fn rotate(&self, key: &str) {
        let mut current = self.key.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = Some(key.trim().to_string()).filter(|key| !key.is_empty());
    }
}

impl Credentials for RotatingCredentials {
    fn api_key(&self) -> Option<String> {
        let current = self.key.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        current.clone().or_else(|| self.env.api_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_credentials_follow_rotation() {
        let creds = EnvCredentials::new("FLASHDECK_TEST_ROTATING_KEY");
        std::env::remove_var(creds.var());
        assert_eq!(creds.api_key(), None);

        std::env::set_var(creds.var(), "sk-first");
        assert_eq!(creds.api_key().as_deref(), Some("sk-first"));

        std::env::set_var(creds.var(), "  ");
        assert_eq!(creds.api_key(), None);
        std::env::remove_var(creds.var());
    }

    #[test]
    fn test_rotated_key_overrides_environment() {
        let creds = RotatingCredentials::new("FLASHDECK_TEST_OVERRIDDEN_KEY");
        std::env::set_var(creds.var(), "sk-env");
        assert_eq!(creds.api_key().as_deref(), Some("sk-env"));

        creds.rotate(" sk-runtime ");
        assert_eq!(creds.api_key().as_deref(), Some("sk-runtime"));

        creds.rotate("");
        assert_eq!(creds.api_key().as_deref(), Some("sk-env"));
        std::env::remove_var(creds.var());
    }
}
