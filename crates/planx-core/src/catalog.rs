//! # Catalog Interface
//!
//! The catalog resolves table names to their schema and (optional) statistics.
//! `PlanBuilder` uses it to produce fully-typed `Scan` nodes, standing in for
//! the host engine's binder.
//!
//! Tables are identified by `TableRef` (schema + name). `InMemoryCatalog`
//! keys them by `schema.table` and is populated programmatically.

use crate::expr::TableRef;
use crate::stats::Statistics;
use crate::types::Schema;
use std::collections::HashMap;

/// Schema and statistics of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMeta {
    pub schema: Schema,
    pub statistics: Option<Statistics>,
}

/// Catalog provides schema and statistics information.
pub trait Catalog: Send + Sync {
    fn get_table(&self, table: &TableRef) -> Option<TableMeta>;
}

/// In-memory catalog for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    tables: HashMap<String, TableMeta>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: &TableRef, schema: Schema, statistics: Option<Statistics>) {
        self.tables
            .insert(table.to_string(), TableMeta { schema, statistics });
    }
}

impl Catalog for InMemoryCatalog {
    fn get_table(&self, table: &TableRef) -> Option<TableMeta> {
        self.tables.get(&table.to_string()).cloned()
    }
}
