//! SQLFlow Intermediate Representation (IR)
//!
//! Canonical JSON representation of extended SQL statements, handed to the
//! backend code generators. Expressions arrive here already rendered to text.
//! Maps are ordered so serialization is deterministic for caching and
//! provenance.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

mod types;
pub use types::*;

/// A parsed program: statements in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    /// Calculate fingerprint (SHA-256) for deterministic caching
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        fingerprint_of(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Statement {
    /// Plain SQL passed through to the database.
    Standard { sql: String },
    Train(TrainStmt),
    Predict(PredictStmt),
    Explain(ExplainStmt),
    Evaluate(EvaluateStmt),
}

impl Statement {
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        fingerprint_of(self)
    }

    /// The standard SQL feeding the statement.
    pub fn select(&self) -> &str {
        match self {
            Statement::Standard { sql } => sql,
            Statement::Train(s) => &s.select,
            Statement::Predict(s) => &s.select,
            Statement::Explain(s) => &s.select,
            Statement::Evaluate(s) => &s.select,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainStmt {
    pub original_sql: String,
    pub select: String,
    pub estimator: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "FeatureColumns::is_empty")]
    pub features: FeatureColumns,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub into: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictStmt {
    pub original_sql: String,
    pub select: String,
    pub result: ResultTarget,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    pub using: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainStmt {
    pub original_sql: String,
    pub select: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explainer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub into: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluateStmt {
    pub original_sql: String,
    pub select: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub into: String,
}

fn fingerprint_of<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
