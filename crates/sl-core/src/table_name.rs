//! Strongly-typed table name wrapper.

use crate::newtype_string::define_newtype_string;

define_newtype_string! {
    /// Name of a table the tooling creates itself, such as the migration ledger.
    ///
    /// Ledger table names are spliced into DDL, so [`is_plain_identifier`]
    /// is checked when configuration is loaded and again by the ledger.
    ///
    /// [`is_plain_identifier`]: TableName::is_plain_identifier
    pub struct TableName;
}

impl TableName {
    /// True when the name is an unquoted SQL identifier: an ASCII letter or
    /// underscore followed by ASCII letters, digits, or underscores.
    pub fn is_plain_identifier(&self) -> bool {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_identifier() {
        assert!(TableName::new("schema_migrations").is_plain_identifier());
        assert!(TableName::new("_ledger2").is_plain_identifier());
    }

    #[test]
    fn test_rejects_quoting_and_punctuation() {
        assert!(!TableName::new("2ledger").is_plain_identifier());
        assert!(!TableName::new("main.ledger").is_plain_identifier());
        assert!(!TableName::new("ledger; DROP TABLE x").is_plain_identifier());
        assert!(!TableName::new("\"ledger\"").is_plain_identifier());
    }

    #[test]
    fn test_empty_rejected() {
        assert!(TableName::try_new("").is_none());
        assert!(serde_yaml::from_str::<TableName>("''").is_err());
    }
}
