//! Translates the typed [`search_types::Query`] AST into tantivy's native
//! query primitives (§4.3 "Query translation").

use search_types::Query as DocQuery;
use serde_json::Value;
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query as TantivyQuery, QueryParser, RegexQuery, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Term};
use tantivy::Index;

use crate::error::{Error, Result};
use crate::schema::FieldPlan;

/// Translates a parsed query into a boxed tantivy query, resolving field
/// paths against `plan`. `index` and `parser` back an unscoped `{text: {query}}`
/// search across every mapped text field; a scoped `{text: {query, path}}`
/// builds its own single-field parser from `index`.
pub fn translate(
    query: &DocQuery,
    plan: &FieldPlan,
    index: &Index,
    parser: &QueryParser,
) -> Result<Box<dyn TantivyQuery>> {
    match query {
        DocQuery::MatchAll => Ok(Box::new(AllQuery)),
        DocQuery::Compound { must, should, must_not } => {
            let mut clauses = Vec::new();
            for q in must {
                clauses.push((Occur::Must, translate(q, plan, index, parser)?));
            }
            for q in should {
                clauses.push((Occur::Should, translate(q, plan, index, parser)?));
            }
            for q in must_not {
                clauses.push((Occur::MustNot, translate(q, plan, index, parser)?));
            }
            if clauses.is_empty() {
                return Ok(Box::new(AllQuery));
            }
            Ok(Box::new(BooleanQuery::new(clauses)))
        }
        DocQuery::Text { query, path } => match path {
            Some(path) => {
                let field = resolve_field(plan, path)?;
                let field_parser = QueryParser::for_index(index, vec![field]);
                field_parser
                    .parse_query(query)
                    .map_err(|e| Error::InvalidQuery(e.to_string()))
            }
            None => parser
                .parse_query(query)
                .map_err(|e| Error::InvalidQuery(e.to_string())),
        },
        DocQuery::Term { value, path } => {
            let field = resolve_field(plan, path)?;
            Ok(Box::new(term_query(field, value)?))
        }
        DocQuery::Wildcard { value, path } => {
            let field = resolve_field(plan, path)?;
            let pattern = glob_to_regex(value);
            Ok(Box::new(
                RegexQuery::from_pattern(&pattern, field).map_err(Error::Tantivy)?,
            ))
        }
    }
}

fn resolve_field(plan: &FieldPlan, path: &str) -> Result<Field> {
    plan.fields
        .get(path)
        .copied()
        .ok_or_else(|| Error::InvalidQuery(format!("unknown field `{path}`")))
}

fn term_query(field: Field, value: &Value) -> Result<TermQuery> {
    let term = match value {
        Value::String(s) => Term::from_field_text(field, s),
        Value::Number(n) if n.as_f64().is_some() => Term::from_field_f64(field, n.as_f64().unwrap()),
        Value::Bool(b) => Term::from_field_bool(field, *b),
        other => return Err(Error::InvalidQuery(format!("unsupported term value: {other}"))),
    };
    Ok(TermQuery::new(term, IndexRecordOption::Basic))
}

/// Converts a `*`/`?` glob pattern into the regex `RegexQuery` expects.
/// `RegexQuery::from_pattern` compiles its pattern as an fst automaton
/// that is already implicitly anchored to the whole term; `^`/`$` are not
/// valid there and would make every wildcard query fail to compile.
fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            c if is_regex_meta(c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

fn is_regex_meta(c: char) -> bool {
    matches!(c, '.' | '^' | '$' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_star_becomes_dot_star() {
        assert_eq!(glob_to_regex("re*"), "re.*");
    }

    #[test]
    fn glob_question_mark_becomes_single_dot() {
        assert_eq!(glob_to_regex("re?"), "re.");
    }

    #[test]
    fn glob_escapes_regex_metacharacters() {
        assert_eq!(glob_to_regex("a.b"), "a\\.b");
    }

    #[test]
    fn glob_does_not_anchor_the_pattern() {
        assert!(!glob_to_regex("re*").starts_with('^'));
        assert!(!glob_to_regex("re*").ends_with('$'));
    }
}
