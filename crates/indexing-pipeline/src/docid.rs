//! Resolves the id a document is written to the index under (§4.5 step 3:
//! "stringify and normalize the configured `id_field` onto `_id`").

use search_types::config::INTRINSIC_ID_SENTINEL;
use serde_json::Value;
use source_adapter::SourceDocument;

/// The index document id for `source_doc` under `id_field`. When `id_field`
/// is the intrinsic sentinel this is the adapter's own id (already derived
/// from the source collection's native identifier); otherwise it is the
/// stringified value of `fields[id_field]`, or `None` if that field is
/// absent (the document is skipped, per `Document::is_routable`).
pub fn resolve_doc_id(source_doc: &SourceDocument, id_field: &str) -> Option<String> {
    if id_field == INTRINSIC_ID_SENTINEL {
        return Some(source_doc.document.id.clone());
    }
    source_doc.document.fields.get(id_field).map(stringify)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_types::Document;
    use serde_json::json;

    fn doc(fields: serde_json::Map<String, Value>) -> SourceDocument {
        SourceDocument { document: Document::new("abc123", fields), timestamp: None }
    }

    #[test]
    fn intrinsic_sentinel_uses_document_id() {
        let d = doc(serde_json::Map::new());
        assert_eq!(resolve_doc_id(&d, "_id").as_deref(), Some("abc123"));
    }

    #[test]
    fn custom_id_field_is_stringified_from_fields() {
        let mut fields = serde_json::Map::new();
        fields.insert("sku".to_string(), json!("SKU-42"));
        let d = doc(fields);
        assert_eq!(resolve_doc_id(&d, "sku").as_deref(), Some("SKU-42"));
    }

    #[test]
    fn missing_custom_id_field_is_none() {
        let d = doc(serde_json::Map::new());
        assert!(resolve_doc_id(&d, "sku").is_none());
    }

    #[test]
    fn numeric_id_field_is_stringified() {
        let mut fields = serde_json::Map::new();
        fields.insert("seq".to_string(), json!(42));
        let d = doc(fields);
        assert_eq!(resolve_doc_id(&d, "seq").as_deref(), Some("42"));
    }
}
