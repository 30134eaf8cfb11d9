use serde_json::Value;

use crate::error::{Error, Result};

/// The typed query AST that the search engine translates to its own native
/// query primitives (§4.3, §9's "typed variants over untyped maps" note).
///
/// Built once at the HTTP boundary via [`Query::parse`] and never passed
/// around as a raw [`serde_json::Value`] past that point.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Compound { must: Vec<Query>, should: Vec<Query>, must_not: Vec<Query> },
    Text { query: String, path: Option<String> },
    Term { value: Value, path: String },
    Wildcard { value: String, path: String },
    MatchAll,
}

impl Query {
    /// Parses a query request body into the typed AST. Unknown top-level
    /// keys are ignored; an empty object or unrecognized shape falls back
    /// to [`Query::MatchAll`] (lenient default, §4.3). Missing required
    /// sub-keys fail with [`Error::InvalidQuery`].
    pub fn parse(value: &Value) -> Result<Query> {
        let obj = match value.as_object() {
            Some(obj) => obj,
            None => return Ok(Query::MatchAll),
        };

        if let Some(compound) = obj.get("compound") {
            return Self::parse_compound(compound);
        }
        if let Some(text) = obj.get("text") {
            return Self::parse_text(text);
        }
        if let Some(term) = obj.get("term") {
            return Self::parse_term(term);
        }
        if let Some(wildcard) = obj.get("wildcard") {
            return Self::parse_wildcard(wildcard);
        }
        // `match_all` and anything else (including an empty object) is the
        // lenient match-all default.
        Ok(Query::MatchAll)
    }

    fn parse_compound(value: &Value) -> Result<Query> {
        let obj = value.as_object().ok_or_else(|| {
            Error::InvalidQuery("compound must be an object".to_string())
        })?;
        let parse_clauses = |key: &str| -> Result<Vec<Query>> {
            match obj.get(key) {
                None => Ok(Vec::new()),
                Some(Value::Array(items)) => items.iter().map(Query::parse).collect(),
                Some(other) => Ok(vec![Query::parse(other)?]),
            }
        };
        Ok(Query::Compound {
            must: parse_clauses("must")?,
            should: parse_clauses("should")?,
            must_not: parse_clauses("mustNot")?,
        })
    }

    fn parse_text(value: &Value) -> Result<Query> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::InvalidQuery("text must be an object".to_string()))?;
        let query = obj
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidQuery("text.query is required".to_string()))?
            .to_string();
        let path = obj.get("path").and_then(Value::as_str).map(str::to_string);
        Ok(Query::Text { query, path })
    }

    fn parse_term(value: &Value) -> Result<Query> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::InvalidQuery("term must be an object".to_string()))?;
        let term_value = obj
            .get("value")
            .ok_or_else(|| Error::InvalidQuery("term.value is required".to_string()))?
            .clone();
        let path = obj
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidQuery("term.path is required".to_string()))?
            .to_string();
        Ok(Query::Term { value: term_value, path })
    }

    fn parse_wildcard(value: &Value) -> Result<Query> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::InvalidQuery("wildcard must be an object".to_string()))?;
        let term_value = obj
            .get("value")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidQuery("wildcard.value is required".to_string()))?
            .to_string();
        let path = obj
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidQuery("wildcard.path is required".to_string()))?
            .to_string();
        Ok(Query::Wildcard { value: term_value, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_is_match_all() {
        assert_eq!(Query::parse(&json!({})).unwrap(), Query::MatchAll);
    }

    #[test]
    fn unknown_shape_is_match_all() {
        assert_eq!(Query::parse(&json!({"nonsense": 1})).unwrap(), Query::MatchAll);
    }

    #[test]
    fn text_without_path_is_parsed() {
        let q = Query::parse(&json!({"text": {"query": "red fox"}})).unwrap();
        assert_eq!(q, Query::Text { query: "red fox".to_string(), path: None });
    }

    #[test]
    fn term_missing_value_is_invalid() {
        let err = Query::parse(&json!({"term": {"path": "title"}})).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn wildcard_missing_path_is_invalid() {
        let err = Query::parse(&json!({"wildcard": {"value": "re*"}})).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn compound_recurses_into_clauses() {
        let q = Query::parse(&json!({
            "compound": {
                "must": [{"term": {"value": "a", "path": "p"}}],
                "should": [{"text": {"query": "b"}}],
            }
        }))
        .unwrap();
        match q {
            Query::Compound { must, should, must_not } => {
                assert_eq!(must.len(), 1);
                assert_eq!(should.len(), 1);
                assert!(must_not.is_empty());
            }
            _ => panic!("expected compound"),
        }
    }
}
