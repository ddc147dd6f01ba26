//! Neighbor directory: static knowledge of peer identities and their
//! capability tags.
//!
//! The directory is read-only once constructed. It stores authoritative
//! capability metadata only — a peer's load is never cached here, it is
//! re-queried over the wire every round.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Address of an agent in the messaging substrate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Reference to a known peer: its address plus the capability tags it
/// advertises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRef {
    /// Address of the peer in the messaging substrate.
    pub address: AgentId,
    /// Capability tags the peer advertises.
    #[serde(default)]
    pub capabilities: HashSet<String>,
}

impl PeerRef {
    /// Create a peer reference with no advertised capabilities.
    pub fn new(address: impl Into<AgentId>) -> Self {
        Self {
            address: address.into(),
            capabilities: HashSet::new(),
        }
    }

    /// Create a peer reference with the given capability tags.
    pub fn with_capabilities<I, S>(address: impl Into<AgentId>, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            address: address.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the peer advertises the given capability tag.
    pub fn has_capability(&self, tag: &str) -> bool {
        self.capabilities.contains(tag)
    }
}

/// Static directory of known peers.
#[derive(Debug, Clone, Default)]
pub struct NeighborDirectory {
    peers: Vec<PeerRef>,
}

impl NeighborDirectory {
    pub fn new(peers: Vec<PeerRef>) -> Self {
        Self { peers }
    }

    /// All known peers.
    pub fn list_peers(&self) -> &[PeerRef] {
        &self.peers
    }

    /// Peers whose capability set contains the given tag.
    pub fn find_compatible_peers(&self, required_capability: &str) -> Vec<&PeerRef> {
        self.peers
            .iter()
            .filter(|p| p.has_capability(required_capability))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> NeighborDirectory {
        NeighborDirectory::new(vec![
            PeerRef::with_capabilities("welder@swarm", ["welder"]),
            PeerRef::with_capabilities("rigger@swarm", ["rigger", "welder"]),
            PeerRef::new("plain@swarm"),
        ])
    }

    #[test]
    fn test_list_peers() {
        let dir = directory();
        assert_eq!(dir.len(), 3);
        assert!(!dir.is_empty());
    }

    #[test]
    fn test_find_compatible_peers() {
        let dir = directory();
        let welders = dir.find_compatible_peers("welder");
        assert_eq!(welders.len(), 2);
        assert!(welders.iter().all(|p| p.has_capability("welder")));
    }

    #[test]
    fn test_find_compatible_peers_no_match() {
        let dir = directory();
        assert!(dir.find_compatible_peers("diver").is_empty());
    }
}
