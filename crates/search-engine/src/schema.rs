//! Translates a §3 field mapping into tantivy's native schema (§4.3
//! "Mapping semantics"). Fields are always stored, so a hit's `source` map
//! can always be rebuilt from the index alone; facetable fields get a
//! second, parallel `Facet` field tantivy can aggregate over.

use std::collections::HashMap;

use search_types::config::{FieldMapping, FieldType, Mappings};
use tantivy::schema::{
    Facet, FacetOptions, Field, JsonObjectOptions, Schema, SchemaBuilder, TextFieldIndexing,
    TextOptions, FAST, INDEXED, STORED, STRING, TEXT,
};
use tantivy::tokenizer::TokenizerManager;

use crate::error::{Error, Result};

pub const ID_FIELD_NAME: &str = "_id";

/// Suffix appended to a facetable field's name for its parallel `Facet`
/// field, e.g. mapping `color` (facet: true) also gets `color__facet`.
pub const FACET_SUFFIX: &str = "__facet";

/// Field name backing unmapped fields when `mappings.dynamic == true`
/// (§4.3): a single tantivy JSON field, stored and indexed with default
/// analysis, addressed as `_dynamic.<field>` in queries.
pub const DYNAMIC_FIELD_NAME: &str = "_dynamic";

#[derive(Debug, Clone)]
pub struct FieldPlan {
    pub schema: Schema,
    pub id_field: Field,
    /// Mapping name -> tantivy field, for explicitly configured fields.
    pub fields: HashMap<String, Field>,
    /// Mapping name -> its parallel facet field, for fields with `facet: true`.
    pub facet_fields: HashMap<String, Field>,
    pub dynamic: bool,
    /// Fields known to be textual, for the unscoped `{text: {query}}` case.
    pub text_fields: Vec<Field>,
    /// Present iff `mappings.dynamic == true`.
    pub dynamic_field: Option<Field>,
}

/// Builds the tantivy schema for an index's mappings. Fails with
/// [`Error::UnknownAnalyzer`] if a text field names an analyzer the engine
/// doesn't recognize (§4.3).
pub fn build_schema(mappings: &Mappings, tokenizers: &TokenizerManager) -> Result<FieldPlan> {
    let mut builder = SchemaBuilder::default();
    let id_field = builder.add_text_field(ID_FIELD_NAME, STRING | STORED | FAST);

    let mut fields = HashMap::new();
    let mut facet_fields = HashMap::new();
    let mut text_fields = Vec::new();

    for mapping in &mappings.fields {
        let field = add_mapped_field(&mut builder, mapping, tokenizers)?;
        if matches!(mapping.field_type, FieldType::Text) {
            text_fields.push(field);
        }
        fields.insert(mapping.name.clone(), field);

        if mapping.facet {
            let facet_name = format!("{}{FACET_SUFFIX}", mapping.name);
            let facet_field = builder.add_facet_field(&facet_name, FacetOptions::default().set_stored());
            facet_fields.insert(mapping.name.clone(), facet_field);
        }
    }

    let dynamic_field = mappings.dynamic.then(|| {
        let options: JsonObjectOptions = TEXT.into();
        builder.add_json_field(DYNAMIC_FIELD_NAME, options.set_stored())
    });

    let schema = builder.build();
    Ok(FieldPlan {
        schema,
        id_field,
        fields,
        facet_fields,
        dynamic: mappings.dynamic,
        text_fields,
        dynamic_field,
    })
}

fn add_mapped_field(
    builder: &mut SchemaBuilder,
    mapping: &FieldMapping,
    tokenizers: &TokenizerManager,
) -> Result<Field> {
    Ok(match mapping.field_type {
        FieldType::Text => {
            let tokenizer_name = mapping.analyzer.as_deref().unwrap_or("default");
            if tokenizers.get(tokenizer_name).is_none() {
                return Err(Error::UnknownAnalyzer(tokenizer_name.to_string()));
            }
            let indexing = TextFieldIndexing::default()
                .set_tokenizer(tokenizer_name)
                .set_index_option(tantivy::schema::IndexRecordOption::WithFreqsAndPositions);
            let options = TextOptions::default().set_indexing_options(indexing).set_stored();
            builder.add_text_field(&mapping.name, options)
        }
        FieldType::Keyword => builder.add_text_field(&mapping.name, STRING | STORED),
        FieldType::Numeric => builder.add_f64_field(&mapping.name, INDEXED | STORED | FAST),
        FieldType::Date => builder.add_date_field(&mapping.name, INDEXED | STORED | FAST),
        FieldType::Boolean => builder.add_bool_field(&mapping.name, INDEXED | STORED),
    })
}

/// Builds the single-component facet path tantivy expects, from an
/// arbitrary stringified value.
pub fn facet_path(value: &str) -> Facet {
    Facet::from(&format!("/{value}"))
}

