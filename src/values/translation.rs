//! Value translation between database values and graph values.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A bidirectional mapping between database values and graph values.
///
/// Translators are identified by name; two translators with the same name
/// are assumed to perform the same mapping.
pub trait Translator: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn to_graph_value(&self, db_value: &str) -> Option<String>;

    fn to_db_value(&self, graph_value: &str) -> Option<String>;
}

/// A dictionary of `(db value, graph value)` pairs.
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    name: String,
    to_graph: HashMap<String, String>,
    to_db: HashMap<String, String>,
}

impl TranslationTable {
    pub fn new(name: impl Into<String>) -> Self {
        TranslationTable {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_pairs<I, D, G>(name: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (D, G)>,
        D: Into<String>,
        G: Into<String>,
    {
        let mut table = TranslationTable::new(name);
        for (db, graph) in pairs {
            table.insert(db, graph);
        }
        table
    }

    pub fn insert(&mut self, db_value: impl Into<String>, graph_value: impl Into<String>) {
        let db_value = db_value.into();
        let graph_value = graph_value.into();
        self.to_graph.insert(db_value.clone(), graph_value.clone());
        self.to_db.insert(graph_value, db_value);
    }

    pub fn len(&self) -> usize {
        self.to_graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_graph.is_empty()
    }
}

impl Translator for TranslationTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn to_graph_value(&self, db_value: &str) -> Option<String> {
        self.to_graph.get(db_value).cloned()
    }

    fn to_db_value(&self, graph_value: &str) -> Option<String> {
        self.to_db.get(graph_value).cloned()
    }
}

/// Shared handle to a translator, compared by name.
#[derive(Clone)]
pub struct TranslatorRef(Arc<dyn Translator>);

impl TranslatorRef {
    pub fn new(translator: impl Translator + 'static) -> Self {
        TranslatorRef(Arc::new(translator))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn to_graph_value(&self, db_value: &str) -> Option<String> {
        self.0.to_graph_value(db_value)
    }

    pub fn to_db_value(&self, graph_value: &str) -> Option<String> {
        self.0.to_db_value(graph_value)
    }
}

impl From<Arc<dyn Translator>> for TranslatorRef {
    fn from(translator: Arc<dyn Translator>) -> Self {
        TranslatorRef(translator)
    }
}

impl PartialEq for TranslatorRef {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for TranslatorRef {}

impl Hash for TranslatorRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl fmt::Debug for TranslatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Translator({})", self.name())
    }
}
