use serde::{Deserialize, Serialize};

/// How the two sides of a relation join in the domain DB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub from_table: String,
    pub from_field: String,
    pub to_table: String,
    pub to_field: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
}

/// One declared edge of the domain relationship graph. The set of rows forms
/// the graph that ontology traversal walks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OntologyRelation {
    pub from_entity_type: String,
    pub to_entity_type: String,
    pub relation_type: String,
    pub join_spec: JoinSpec,
    pub cardinality: Cardinality,
}
