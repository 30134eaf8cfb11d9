use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An in-flight document handed from the source adapter to the indexing
/// pipeline and ultimately to the search engine (§3).
///
/// Invariant: `id` is always a string — numeric, UUID or hex-encoded
/// intrinsic IDs are stringified by the pipeline before this type is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Document { id: id.into(), fields }
    }

    /// A document is "routable" iff `fields[id_field]` exists (§3).
    pub fn is_routable(&self, id_field: &str) -> bool {
        self.fields.contains_key(id_field)
    }
}
