//! Log object keys
//!
//! A call log is addressed by its application name and call ID and stored at
//! the object key `/app_name/call_id`. Identifiers are validated before the key
//! is built so that two different pairs can never map onto the same key.

use std::fmt;

use crate::error::{Error, Result};

/// Content type every log object is stored with
pub const LOG_CONTENT_TYPE: &str = "text/plain";

/// A validated (application name, call ID) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogKey {
    app_name: String,
    call_id: String,
}

impl LogKey {
    /// Validate both identifiers and build the key
    pub fn new(app_name: impl Into<String>, call_id: impl Into<String>) -> Result<Self> {
        let app_name = app_name.into();
        let call_id = call_id.into();
        validate_identifier("application name", &app_name)?;
        validate_identifier("call ID", &call_id)?;
        Ok(Self { app_name, call_id })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// Object key inside the bucket
    pub fn object_key(&self) -> String {
        format!("/{}/{}", self.app_name, self.call_id)
    }
}

impl fmt::Display for LogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.app_name, self.call_id)
    }
}

fn validate_identifier(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidIdentifier(format!("{what} cannot be empty")));
    }
    if value.contains('/') {
        return Err(Error::InvalidIdentifier(format!(
            "{what} '{value}' must not contain '/'"
        )));
    }
    if value == "." || value == ".." {
        return Err(Error::InvalidIdentifier(format!(
            "{what} '{value}' is not a valid path segment"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key() {
        let key = LogKey::new("myapp", "01HV6Z3K9Q").unwrap();
        assert_eq!(key.object_key(), "/myapp/01HV6Z3K9Q");
        assert_eq!(key.to_string(), "/myapp/01HV6Z3K9Q");
        assert_eq!(key.app_name(), "myapp");
        assert_eq!(key.call_id(), "01HV6Z3K9Q");
    }

    #[test]
    fn test_empty_identifiers() {
        assert!(matches!(
            LogKey::new("", "call"),
            Err(Error::InvalidIdentifier(_))
        ));
        assert!(matches!(
            LogKey::new("app", ""),
            Err(Error::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_separator_rejected() {
        // "a/b" + "c" and "a" + "b/c" would otherwise share "/a/b/c"
        assert!(LogKey::new("a/b", "c").is_err());
        assert!(LogKey::new("a", "b/c").is_err());
    }

    #[test]
    fn test_dot_segments_rejected() {
        assert!(LogKey::new("..", "call").is_err());
        assert!(LogKey::new("app", ".").is_err());
        assert!(LogKey::new("app", "..call").is_ok());
    }

    #[test]
    fn test_error_names_identifier() {
        let err = LogKey::new("app", "").unwrap_err();
        assert!(err.to_string().contains("call ID"));
    }
}
