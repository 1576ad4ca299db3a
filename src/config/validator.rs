use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// Knows which configuration fields dotx reads, so typos get reported
/// instead of silently ignored.
pub struct ConfigValidator {
    /// Set of valid configuration fields that are recognized by dotx
    known_fields: HashSet<&'static str>,
}

impl ConfigValidator {
    /// Create a new validator with known configuration fields
    #[must_use]
    pub fn new() -> Self {
        let known_fields = [
            "core",
            "core.rename_prefix",
            "core.target",
            "ignore",
            "ignore.patterns",
            "always_create",
            "always_create.patterns",
            "ledger",
            "ledger.enabled",
            "ledger.path",
        ]
        .into_iter()
        .collect();

        Self { known_fields }
    }

    /// Returns the dotted names of fields in `content` that dotx does not
    /// know. Content that does not parse yields nothing; parsing errors are
    /// reported by the loader.
    #[must_use]
    pub fn unknown_fields(&self, content: &str) -> Vec<String> {
        let Ok(parsed) = toml::from_str::<toml::Table>(content) else {
            return Vec::new();
        };
        let mut unknown = Vec::new();
        self.check_table(&parsed, "", &mut unknown);
        unknown
    }

    /// Logs a warning for each unknown field in `content`.
    pub fn warn_unknown_fields(&self, content: &str, config_path: &Path) {
        for field in self.unknown_fields(content) {
            warn!(
                "Unknown configuration field '{field}' in {}",
                config_path.display()
            );
        }
    }

    /// Recursively checks a TOML table against the known fields
    fn check_table(&self, table: &toml::Table, prefix: &str, unknown: &mut Vec<String>) {
        for (key, value) in table {
            let full_key = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };

            if !self.known_fields.contains(full_key.as_str()) {
                unknown.push(full_key);
            } else if let toml::Value::Table(nested) = value {
                self.check_table(nested, &full_key, unknown);
            }
        }
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_fields_pass() {
        let content = "[core]\nrename_prefix = \"dot-\"\n[ledger]\nenabled = true\n";
        assert!(ConfigValidator::new().unknown_fields(content).is_empty());
    }

    #[test]
    fn test_unknown_fields_are_reported() {
        let content = "[core]\nrename_prefx = \"dot-\"\n[remotes]\norigin = \"x\"\n";
        let unknown = ConfigValidator::new().unknown_fields(content);
        assert_eq!(unknown, vec!["core.rename_prefx", "remotes"]);
    }

    #[test]
    fn test_unparseable_content_reports_nothing() {
        assert!(ConfigValidator::new().unknown_fields("[core").is_empty());
    }
}
