//! A single on-disk tantivy index: one physical shard (§3, §4.3).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use search_types::config::{FieldType, Mappings};
use search_types::{Query as DocQuery, SearchResult};
use serde_json::{Map, Value};
use tantivy::collector::{FacetCollector, TopDocs};
use tantivy::query::QueryParser;
use tantivy::schema::{document::TantivyDocument, Value as TantivyValue};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy};
use tracing::info;

use crate::error::{Error, Result};
use crate::query::translate;
use crate::schema::{self, FieldPlan};

const WRITER_MEMORY_BUDGET: usize = 50_000_000;

pub struct ShardHandle {
    pub physical_name: String,
    path: PathBuf,
    index: Index,
    writer: Mutex<IndexWriter>,
    reader: IndexReader,
    plan: FieldPlan,
}

impl ShardHandle {
    /// Opens the shard directory at `path`, creating it (and the schema)
    /// if absent. Opening an existing, differently-mapped shard is not
    /// reconciled here — mapping changes are out of scope (§6 non-goals).
    pub fn open(physical_name: String, path: PathBuf, mappings: &Mappings) -> Result<Self> {
        std::fs::create_dir_all(&path)?;
        let dir = tantivy::directory::MmapDirectory::open(&path)
            .map_err(|e| Error::ShardOpenFailed(physical_name.clone(), e.to_string()))?;

        let plan = schema::build_schema(mappings, &Default::default())?;

        let index = if tantivy::Index::exists(&dir)
            .map_err(|e| Error::ShardOpenFailed(physical_name.clone(), e.to_string()))?
        {
            Index::open(dir).map_err(|e| Error::ShardOpenFailed(physical_name.clone(), e.to_string()))?
        } else {
            Index::create(dir, plan.schema.clone(), Default::default())
                .map_err(|e| Error::ShardOpenFailed(physical_name.clone(), e.to_string()))?
        };

        let writer = index
            .writer(WRITER_MEMORY_BUDGET)
            .map_err(|e| Error::ShardOpenFailed(physical_name.clone(), e.to_string()))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e: tantivy::TantivyError| Error::ShardOpenFailed(physical_name.clone(), e.to_string()))?;

        info!(shard = %physical_name, path = %path.display(), "opened shard");
        Ok(ShardHandle { physical_name, path, index, writer: Mutex::new(writer), reader, plan })
    }

    pub fn doc_count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Indexes a single document, committing immediately so the write is
    /// durable before the call returns (§4.3 "Writes must be durable").
    pub fn index_one(&self, doc_id: &str, fields: &Map<String, Value>) -> Result<()> {
        self.add_documents(std::iter::once((doc_id.to_string(), fields.clone())))?;
        self.commit()
    }

    /// Batched write to this shard; callers have already done shard
    /// routing (§4.3 `index_batch`). One commit for the whole batch.
    pub fn index_batch(&self, docs: &[(String, Map<String, Value>)]) -> Result<()> {
        self.add_documents(docs.iter().cloned())?;
        self.commit()
    }

    fn add_documents(&self, docs: impl Iterator<Item = (String, Map<String, Value>)>) -> Result<()> {
        let writer = self.writer.lock();
        for (doc_id, fields) in docs {
            let tantivy_doc = self.build_document(&doc_id, &fields);
            // Replace semantics: index_one/index_batch are idempotent on
            // doc_id (§9's at-least-once note), so delete-then-add.
            writer.delete_term(tantivy::Term::from_field_text(self.plan.id_field, &doc_id));
            writer
                .add_document(tantivy_doc)
                .map_err(|e| Error::BulkWriteFailed(self.physical_name.clone(), e.to_string()))?;
        }
        Ok(())
    }

    fn build_document(&self, doc_id: &str, fields: &Map<String, Value>) -> TantivyDocument {
        let mut doc = TantivyDocument::default();
        doc.add_text(self.plan.id_field, doc_id);

        let mut dynamic_fields = Map::new();
        for (name, value) in fields {
            if let Some(field) = self.plan.fields.get(name) {
                add_mapped_value(&mut doc, *field, value);
                if let Some(facet_field) = self.plan.facet_fields.get(name) {
                    doc.add_facet(*facet_field, schema::facet_path(&stringify(value)));
                }
            } else if self.plan.dynamic {
                dynamic_fields.insert(name.clone(), value.clone());
            }
        }
        if let Some(dynamic_field) = self.plan.dynamic_field {
            if !dynamic_fields.is_empty() {
                doc.add_field_value(dynamic_field, Value::Object(dynamic_fields));
            }
        }
        doc
    }

    pub fn delete(&self, doc_id: &str) -> Result<()> {
        let writer = self.writer.lock();
        writer.delete_term(tantivy::Term::from_field_text(self.plan.id_field, doc_id));
        drop(writer);
        self.commit()
    }

    pub fn commit(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        writer
            .commit()
            .map_err(|e| Error::BulkWriteFailed(self.physical_name.clone(), e.to_string()))?;
        Ok(())
    }

    /// Executes `query` against this shard alone, returning an unsliced,
    /// unsorted-by-caller result the facade merges/slices across shards
    /// (§4.3 "Read operations").
    pub fn search_local(
        &self,
        query: &DocQuery,
        facets: &[search_types::FacetRequest],
        highlight_fields: &[String],
        window: usize,
    ) -> Result<SearchResult> {
        let searcher = self.reader.searcher();
        let default_parser = QueryParser::for_index(&self.index, self.plan.text_fields.clone());
        let tantivy_query = translate(query, &self.plan, &self.index, &default_parser)?;

        let top_docs = searcher
            .search(&tantivy_query, &TopDocs::with_limit(window))
            .map_err(Error::Tantivy)?;

        let snippet_generators = self.build_snippet_generators(&searcher, tantivy_query.as_ref(), highlight_fields);

        let mut hits = Vec::with_capacity(top_docs.len());
        let mut max_score = 0.0f32;
        for (score, address) in &top_docs {
            max_score = max_score.max(*score);
            let doc: TantivyDocument = searcher.doc(*address).map_err(Error::Tantivy)?;
            hits.push(self.to_hit(&doc, *score, &snippet_generators));
        }

        let total = searcher.search(&tantivy_query, &tantivy::collector::Count).map_err(Error::Tantivy)? as u64;

        let facet_results = self.collect_facets(&searcher, &tantivy_query, facets)?;

        Ok(SearchResult {
            hits,
            total,
            max_score,
            facets: if facet_results.is_empty() { None } else { Some(facet_results) },
            partial: false,
            failed_shards: Vec::new(),
        })
    }

    fn collect_facets(
        &self,
        searcher: &tantivy::Searcher,
        query: &dyn tantivy::query::Query,
        facets: &[search_types::FacetRequest],
    ) -> Result<HashMap<String, search_types::FacetResult>> {
        let mut results = HashMap::new();
        for request in facets {
            let Some(facet_field) = self.plan.facet_fields.get(&request.path) else { continue };
            let mut collector = FacetCollector::for_field(*facet_field);
            collector.add_facet("/");
            let counts = searcher.search(query, &collector).map_err(Error::Tantivy)?;
            let buckets = counts
                .get("/")
                .map(|(facet, count)| search_types::FacetBucket {
                    value: facet.to_path_string().trim_start_matches('/').to_string(),
                    count,
                })
                .collect::<Vec<_>>();
            results.insert(request.name.clone(), search_types::FacetResult { buckets });
        }
        Ok(results)
    }

    /// One [`tantivy::SnippetGenerator`] per requested, mapped highlight
    /// field, built against this query so every hit's snippets share the
    /// same term-highlighting pass (§4.3 "fragments its native highlighter
    /// produces").
    fn build_snippet_generators(
        &self,
        searcher: &tantivy::Searcher,
        query: &dyn tantivy::query::Query,
        highlight_fields: &[String],
    ) -> HashMap<String, tantivy::SnippetGenerator> {
        let mut generators = HashMap::new();
        for field_name in highlight_fields {
            let Some(field) = self.plan.fields.get(field_name).copied() else { continue };
            if let Ok(generator) = tantivy::SnippetGenerator::create(searcher, query, field) {
                generators.insert(field_name.clone(), generator);
            }
        }
        generators
    }

    fn to_hit(
        &self,
        doc: &TantivyDocument,
        score: f32,
        snippet_generators: &HashMap<String, tantivy::SnippetGenerator>,
    ) -> search_types::Hit {
        let mut source = Map::new();
        let mut id = String::new();
        for (name, field) in &self.plan.fields {
            if let Some(value) = doc.get_first(*field) {
                source.insert(name.clone(), tantivy_value_to_json(value));
            }
        }
        if let Some(value) = doc.get_first(self.plan.id_field) {
            id = value.as_str().unwrap_or_default().to_string();
        }
        if let Some(dynamic_field) = self.plan.dynamic_field {
            if let Some(TantivyValue::Object(obj)) = doc.get_first(dynamic_field).map(|v| v.as_value()) {
                for (k, v) in obj {
                    source.insert(k.to_string(), tantivy_value_to_json(v));
                }
            }
        }

        let highlight = if snippet_generators.is_empty() {
            None
        } else {
            let mut map = HashMap::new();
            for (field_name, generator) in snippet_generators {
                let snippet = generator.snippet_from_doc(doc);
                if !snippet.fragment().is_empty() {
                    map.insert(field_name.clone(), vec![snippet.to_html()]);
                }
            }
            Some(map)
        };

        search_types::Hit { id, score, source, highlight }
    }

    /// Flushes any uncommitted writes. Shards are otherwise closed by
    /// dropping the handle; tantivy has no explicit close call.
    pub fn close(&self) -> Result<()> {
        self.commit()
    }

    pub fn delete_directory(path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_dir_all(path)?;
        }
        Ok(())
    }
}

fn add_mapped_value(doc: &mut TantivyDocument, field: tantivy::schema::Field, value: &Value) {
    match value {
        Value::String(s) => doc.add_text(field, s),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                doc.add_f64(field, f);
            }
        }
        Value::Bool(b) => doc.add_bool(field, *b),
        Value::Null => {}
        other => doc.add_text(field, other.to_string()),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn tantivy_value_to_json(value: tantivy::schema::document::CompactDocValue<'_>) -> Value {
    match value.as_value() {
        TantivyValue::Str(s) => Value::String(s.to_string()),
        TantivyValue::F64(f) => serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        TantivyValue::Bool(b) => Value::Bool(b),
        TantivyValue::Date(d) => Value::String(d.into_timestamp_secs().to_string()),
        _ => Value::Null,
    }
}

/// The field-type-driven subset of mapping semantics that also determines
/// whether a field participates in the default (unscoped) text search.
pub fn is_text_type(field_type: FieldType) -> bool {
    matches!(field_type, FieldType::Text)
}
