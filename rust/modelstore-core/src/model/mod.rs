// rust/modelstore-core/src/model/mod.rs

//! Trained models and the registry that decodes them.
//!
//! A stored model artifact names its kind in the header. The
//! [`ModelRegistry`] maps each kind to a [`ModelDecoder`] that rebuilds a
//! ready-to-use [`Model`] from the payload bytes.

mod linear;

pub use linear::{LinearDecoder, LinearModel};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::table::Table;

/// Error type returned by decoders; mapped to a deserialization error.
pub type DecodeError = Box<dyn std::error::Error + Send + Sync>;

/// Input columns a model reads and the name of what it predicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub inputs: Vec<String>,
    pub output: String,
}

impl ModelSchema {
    pub fn new<I, S>(inputs: I, output: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            output: output.into(),
        }
    }

    /// Positions of the input columns in `table`.
    ///
    /// Extra columns in the table are ignored.
    ///
    /// # Errors
    ///
    /// Returns a prediction error naming every input column the table lacks.
    pub fn column_indices(&self, table: &Table) -> Result<Vec<usize>> {
        let mut indices = Vec::with_capacity(self.inputs.len());
        let mut missing = Vec::new();
        for name in &self.inputs {
            match table.column_index(name) {
                Some(idx) => indices.push(idx),
                None => missing.push(name.as_str()),
            }
        }
        if !missing.is_empty() {
            return Err(StoreError::prediction(format!(
                "input table is missing columns: {}",
                missing.join(", ")
            )));
        }
        Ok(indices)
    }
}

/// One value per input row, in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    pub name: String,
    pub values: Vec<f64>,
}

impl Predictions {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Appends the predictions to `table` as a new column.
    pub fn to_table(&self, table: &Table) -> Result<Table> {
        if table.num_rows() != self.values.len() {
            return Err(StoreError::prediction(format!(
                "{} predictions for {} rows",
                self.values.len(),
                table.num_rows()
            )));
        }
        let mut columns = table.columns().to_vec();
        columns.push(self.name.clone());

        let mut out = Table::new(columns);
        for (row, value) in table.rows().iter().zip(&self.values) {
            let mut row = row.clone();
            row.push(Some(value.to_string()));
            out.push_row(row)?;
        }
        Ok(out)
    }
}

/// A trained model that can score tables.
pub trait Model: Send + Sync + fmt::Debug {
    /// Registry name of this model's kind.
    fn kind(&self) -> &str;

    fn schema(&self) -> &ModelSchema;

    /// Scores every row of `table`.
    ///
    /// # Errors
    ///
    /// Returns a prediction error if the table does not fit the schema.
    fn predict(&self, table: &Table) -> Result<Predictions>;

    /// Serializes the model parameters. The schema travels separately.
    fn encode_payload(&self) -> Result<Vec<u8>>;
}

/// Rebuilds a model of one kind from its payload.
pub trait ModelDecoder: Send + Sync {
    fn decode(&self, schema: &ModelSchema, payload: &[u8]) -> std::result::Result<Arc<dyn Model>, DecodeError>;
}

/// Known model kinds.
#[derive(Clone)]
pub struct ModelRegistry {
    decoders: HashMap<String, Arc<dyn ModelDecoder>>,
}

impl ModelRegistry {
    /// A registry with no kinds.
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// A registry with the built-in kinds.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(LinearModel::KIND, Arc::new(LinearDecoder));
        registry
    }

    /// Adds or replaces the decoder for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, decoder: Arc<dyn ModelDecoder>) {
        self.decoders.insert(kind.into(), decoder);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.decoders.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub(crate) fn decoder(&self, kind: &str) -> Option<&Arc<dyn ModelDecoder>> {
        self.decoders.get(kind)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_indices() {
        let schema = ModelSchema::new(["age", "income"], "score");
        let table = Table::new(["id", "income", "age"]);

        assert_eq!(schema.column_indices(&table).unwrap(), vec![2, 1]);
    }

    #[test]
    fn test_column_indices_reports_all_missing() {
        let schema = ModelSchema::new(["age", "income", "tenure"], "score");
        let table = Table::new(["income"]);

        let err = schema.column_indices(&table).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("age"));
        assert!(msg.contains("tenure"));
        assert!(!msg.contains("income"));
    }

    #[test]
    fn test_registry_builtin() {
        let registry = ModelRegistry::default();
        assert!(registry.contains("linear"));
        assert!(!ModelRegistry::empty().contains("linear"));
        assert_eq!(registry.kinds(), vec!["linear"]);
    }

    #[test]
    fn test_predictions_to_table() {
        let table = Table::from_rows(["id"], vec![vec![Some("a".into())], vec![Some("b".into())]]).unwrap();
        let predictions = Predictions {
            name: "score".to_string(),
            values: vec![0.5, 1.0],
        };

        let out = predictions.to_table(&table).unwrap();
        assert_eq!(out.columns(), &["id", "score"]);
        assert_eq!(out.cell(0, 1), Some("0.5"));
        assert_eq!(out.cell(1, 1), Some("1"));

        let short = Predictions {
            name: "score".to_string(),
            values: vec![0.5],
        };
        assert!(short.to_table(&table).is_err());
    }
}
