// Secret resolution
// Secrets are fetched once at startup; a missing secret is fatal for the
// operation that needs it.

use std::env;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::{AssistantError, Result};

/// Resolve a named secret.
///
/// The environment is checked first, then a file named after the secret in
/// `secrets_dir`. The value is trimmed of surrounding whitespace either way.
pub fn get_secret(name: &str, secrets_dir: &Path) -> Result<String> {
    if let Ok(value) = env::var(name) {
        let value = value.trim().to_string();
        if !value.is_empty() {
            debug!("Resolved secret {} from environment", name);
            return Ok(value);
        }
    }

    let secret_path = secrets_dir.join(name);
    if secret_path.exists() {
        let value = fs::read_to_string(&secret_path)?.trim().to_string();
        if !value.is_empty() {
            debug!("Resolved secret {} from {}", name, secret_path.display());
            return Ok(value);
        }
    }

    Err(AssistantError::Config(format!(
        "Secret '{}' not found in environment or {}",
        name,
        secrets_dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_secret_from_file() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        fs::write(temp_dir.path().join("TEST_FILE_SECRET"), "  s3cret\n")
            .expect("should write secret file");

        let value =
            get_secret("TEST_FILE_SECRET", temp_dir.path()).expect("should resolve secret");
        assert_eq!(value, "s3cret");
    }

    #[test]
    fn environment_takes_precedence_over_file() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        fs::write(temp_dir.path().join("TEST_ENV_SECRET"), "from-file")
            .expect("should write secret file");

        // SAFETY: test-local variable name, no other test reads it
        unsafe { env::set_var("TEST_ENV_SECRET", "from-env") };
        let value = get_secret("TEST_ENV_SECRET", temp_dir.path()).expect("should resolve secret");
        unsafe { env::remove_var("TEST_ENV_SECRET") };

        assert_eq!(value, "from-env");
    }

    #[test]
    fn missing_secret_is_an_error() {
        let temp_dir = TempDir::new().expect("should create temp dir");

        let result = get_secret("TEST_MISSING_SECRET", temp_dir.path());
        assert!(matches!(result, Err(AssistantError::Config(_))));
    }
}
