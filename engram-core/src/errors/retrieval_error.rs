/// Retrieval and domain-augmentation failures.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("unknown retrieval strategy {name:?}")]
    UnknownStrategy { name: String },

    #[error("ontology has no path from {from} within {max_hops} hops")]
    NoOntologyPath { from: String, max_hops: usize },

    #[error("domain query failed: {0}")]
    DomainQuery(String),
}
