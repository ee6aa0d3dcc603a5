use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Identifiers are plain strings so documents created by the previous
// backend (24-hex ObjectIds) keep loading. New ids are UUID v4 in simple form.
fn fresh_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct AssignmentId(pub String);

impl AssignmentId {
    pub fn new() -> Self {
        Self(fresh_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AssignmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssignmentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a nested node (main color, sub-feeling or final option).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new() -> Self {
        Self(fresh_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque reference to an admin account owned by the identity provider.
/// Stored verbatim, never validated here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct AdminRef(pub String);

impl std::fmt::Display for AdminRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The level of the tree an error or lookup refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeLevel {
    Assignment,
    MainColor,
    SubFeeling,
    FinalOption,
}

impl NodeLevel {
    /// Message shown when a hex collides with a sibling at this level.
    pub fn duplicate_message(&self) -> &'static str {
        match self {
            Self::Assignment | Self::MainColor => "This color already exists in the assignment",
            Self::SubFeeling => "This shade already exists for this main color",
            Self::FinalOption => "This color already exists in final options",
        }
    }
}

impl std::fmt::Display for NodeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Assignment => "Body Assignment",
            Self::MainColor => "Main color",
            Self::SubFeeling => "Sub-feeling",
            Self::FinalOption => "Final option",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_unique_hex() {
        let a = NodeId::new();
        let b = NodeId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn legacy_object_id_deserializes() {
        let id: NodeId = serde_json::from_str("\"65a1f0c2e4b0a1b2c3d4e5f6\"").unwrap();
        assert_eq!(id.as_str(), "65a1f0c2e4b0a1b2c3d4e5f6");
    }
}
