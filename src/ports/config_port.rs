//! Configuration access port trait.

/// Read access to `[section] key = value` settings. Missing or unparsable
/// values fall back to the caller's default.
pub trait ConfigPort {
    /// Trimmed value, `None` when the key is missing or blank.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;

    fn get_string_or(&self, section: &str, key: &str, default: &str) -> String {
        self.get_string(section, key)
            .unwrap_or_else(|| default.to_string())
    }
}
