//! Label model representing a Gmail label

use serde::{Deserialize, Serialize};

/// Unique identifier for a label (Gmail label ID)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LabelId(pub String);

impl LabelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // Well-known Gmail system labels
    pub const INBOX: &'static str = "INBOX";
    pub const UNREAD: &'static str = "UNREAD";
}

impl From<String> for LabelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for LabelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A mail label (system or user-defined)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label ID (e.g., "INBOX", "Label_123")
    pub id: LabelId,
    /// Display name
    pub name: String,
}

impl Label {
    /// Create a new label
    pub fn new(id: impl Into<LabelId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Find the first label whose name matches exactly (case-sensitive)
pub fn find_by_name<'a>(labels: &'a [Label], name: &str) -> Option<&'a Label> {
    labels.iter().find(|l| l.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<Label> {
        vec![
            Label::new(LabelId::INBOX, "INBOX"),
            Label::new("Label_1", "Receipts"),
            Label::new("Label_2", "receipts"),
            Label::new("Label_3", "Receipts"),
        ]
    }

    #[test]
    fn test_find_by_name_first_match() {
        let labels = labels();
        let found = find_by_name(&labels, "Receipts").unwrap();
        assert_eq!(found.id.as_str(), "Label_1");
    }

    #[test]
    fn test_find_by_name_case_sensitive() {
        let labels = labels();
        assert_eq!(find_by_name(&labels, "receipts").unwrap().id.as_str(), "Label_2");
        assert!(find_by_name(&labels, "RECEIPTS").is_none());
    }

    #[test]
    fn test_find_by_name_empty() {
        assert!(find_by_name(&[], "INBOX").is_none());
    }
}
