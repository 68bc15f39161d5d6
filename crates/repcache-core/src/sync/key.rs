use std::fmt;

/// Separates the logical id from each revision component.
const COMPONENT_SEPARATOR: char = '|';

/// Separates a revision name from its value.
const VALUE_SEPARATOR: char = '=';

/// Cache and deduplication key: a logical identity plus the values of the
/// revision counters it depends on.
///
/// Rendered as `logical_id|name=value|name=value`. With no revisions the key
/// is the logical id alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey(String);

impl FetchKey {
    /// Build a key, rejecting identities or names that would make two
    /// different component lists render to the same string.
    pub fn build(logical_id: &str, revisions: &[(&str, u64)]) -> Result<Self, String> {
        if logical_id.is_empty() {
            return Err("logical id must not be empty".to_string());
        }
        if logical_id.contains(COMPONENT_SEPARATOR) {
            return Err(format!(
                "logical id {:?} must not contain '{}'",
                logical_id, COMPONENT_SEPARATOR
            ));
        }

        let mut key = logical_id.to_string();
        for (name, value) in revisions {
            if name.is_empty() {
                return Err(format!("empty revision name for {:?}", logical_id));
            }
            if name.contains(COMPONENT_SEPARATOR) || name.contains(VALUE_SEPARATOR) {
                return Err(format!(
                    "revision name {:?} must not contain '{}' or '{}'",
                    name, COMPONENT_SEPARATOR, VALUE_SEPARATOR
                ));
            }
            key.push(COMPONENT_SEPARATOR);
            key.push_str(name);
            key.push(VALUE_SEPARATOR);
            key.push_str(&value.to_string());
        }

        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FetchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
