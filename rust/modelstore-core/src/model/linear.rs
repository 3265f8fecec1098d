// rust/modelstore-core/src/model/linear.rs

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{DecodeError, Model, ModelDecoder, ModelSchema, Predictions};
use crate::error::{Result, StoreError};
use crate::table::Table;

/// Weighted sum of numeric inputs plus a bias.
///
/// With a threshold set, the model acts as a binary classifier and predicts
/// `1.0` for scores at or above the threshold and `0.0` otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    schema: ModelSchema,
    params: LinearParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LinearParams {
    weights: Vec<f64>,
    bias: f64,
    threshold: Option<f64>,
}

impl LinearModel {
    pub const KIND: &'static str = "linear";

    /// Creates a regression model with one weight per input column.
    ///
    /// # Errors
    ///
    /// Returns an error if the weight count does not match the inputs.
    pub fn new(schema: ModelSchema, weights: Vec<f64>, bias: f64) -> Result<Self> {
        let params = LinearParams {
            weights,
            bias,
            threshold: None,
        };
        Self::from_parts(schema, params).map_err(|e| StoreError::prediction(e.to_string()))
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.params.threshold = Some(threshold);
        self
    }

    pub fn weights(&self) -> &[f64] {
        &self.params.weights
    }

    pub fn bias(&self) -> f64 {
        self.params.bias
    }

    pub fn threshold(&self) -> Option<f64> {
        self.params.threshold
    }

    fn from_parts(schema: ModelSchema, params: LinearParams) -> std::result::Result<Self, String> {
        if params.weights.len() != schema.inputs.len() {
            return Err(format!(
                "{} weights for {} input columns",
                params.weights.len(),
                schema.inputs.len()
            ));
        }
        Ok(Self { schema, params })
    }

    fn score(&self, score: f64) -> f64 {
        match self.params.threshold {
            Some(t) if score >= t => 1.0,
            Some(_) => 0.0,
            None => score,
        }
    }
}

impl Model for LinearModel {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    fn predict(&self, table: &Table) -> Result<Predictions> {
        let indices = self.schema.column_indices(table)?;

        let mut values = Vec::with_capacity(table.num_rows());
        for (row_idx, row) in table.rows().iter().enumerate() {
            let mut sum = self.params.bias;
            for ((&col, weight), name) in indices.iter().zip(&self.params.weights).zip(&self.schema.inputs) {
                let cell = row[col].as_deref().ok_or_else(|| {
                    StoreError::prediction(format!("row {}: column '{}' is missing", row_idx + 1, name))
                })?;
                let value: f64 = cell.trim().parse().map_err(|_| {
                    StoreError::prediction(format!(
                        "row {}: column '{}' value '{}' is not a number",
                        row_idx + 1,
                        name,
                        cell
                    ))
                })?;
                sum += weight * value;
            }
            values.push(self.score(sum));
        }

        Ok(Predictions {
            name: self.schema.output.clone(),
            values,
        })
    }

    fn encode_payload(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.params)
            .map_err(|e| StoreError::serialization(format!("linear model parameters: {e}")))
    }
}

/// Decoder for [`LinearModel`] payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearDecoder;

impl ModelDecoder for LinearDecoder {
    fn decode(&self, schema: &ModelSchema, payload: &[u8]) -> std::result::Result<Arc<dyn Model>, DecodeError> {
        let params: LinearParams = bincode::deserialize(payload)?;
        let model = LinearModel::from_parts(schema.clone(), params)?;
        Ok(Arc::new(model))
    }
}
