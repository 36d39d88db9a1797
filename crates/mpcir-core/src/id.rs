//! Stable node identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable node identifier, unique within its circuit for the lifetime of the
/// circuit. Identifiers are never reused after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        NodeId(raw)
    }
}

impl From<NodeId> for u64 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prints_inner_value() {
        assert_eq!(format!("{}", NodeId(7)), "7");
    }

    #[test]
    fn conversion_roundtrip() {
        let id = NodeId::from(42u64);
        assert_eq!(u64::from(id), 42);
    }

    #[test]
    fn ordering_follows_inner_value() {
        assert!(NodeId(3) < NodeId(10));
    }

    #[test]
    fn serde_roundtrip() {
        let id = NodeId(99);
        let json = serde_json::to_string(&id).unwrap();
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
