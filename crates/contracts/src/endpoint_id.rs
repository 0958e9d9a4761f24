//! Dispatch destination identifier

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier of a dispatch destination.
///
/// Ids come from configuration and ride along on every dispatch, so the
/// wrapper holds an `Arc<str>`: the same allocation backs the gateway's
/// endpoint table and every in-flight request, and cloning is a
/// reference-count bump.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointId(Arc<str>);

impl EndpointId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EndpointId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for EndpointId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl PartialEq<&str> for EndpointId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// On the wire and in config files an id is the bare string.
impl Serialize for EndpointId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EndpointId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_clones_share_the_allocation() {
        let id = EndpointId::from("simple.echo");
        let clone = id.clone();
        assert_eq!(id.as_str().as_ptr(), clone.as_str().as_ptr());
    }

    #[test]
    fn test_compares_against_str_literals() {
        let id: EndpointId = "svc.op".into();
        assert_eq!(id, "svc.op");
        assert_ne!(id, "svc.other");
        assert_eq!(id, EndpointId::from(String::from("svc.op")));
    }

    #[test]
    fn test_usable_as_map_key() {
        let mut endpoints: HashMap<EndpointId, u32> = HashMap::new();
        endpoints.insert("a".into(), 1);
        endpoints.insert("b".into(), 2);
        assert_eq!(endpoints.get(&EndpointId::from("a")), Some(&1));
    }

    #[test]
    fn test_serializes_as_bare_string() {
        let id: EndpointId = "simple.echo".into();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"simple.echo\"");

        let parsed: EndpointId = serde_json::from_str("\"simple.echo\"").unwrap();
        assert_eq!(parsed, id);
    }
}
