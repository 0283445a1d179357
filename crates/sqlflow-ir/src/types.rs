//! Value types shared by IR statements

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Structural classification of a rendered expression. Generators use it to
/// decide how to splice `text`; nothing here is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Number,
    Ident,
    String,
    Operator,
    List,
    Tuple,
    Call,
    Unary,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub kind: ValueKind,
    pub text: String,
}

/// Attributes keyed by their dotted name, e.g. `model.n_classes`.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Rendered feature columns keyed by target name.
pub type FeatureColumns = BTreeMap<String, Vec<String>>;

/// Where predictions are written: `table[.column]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTarget {
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl ResultTarget {
    /// Split at the last `.`; a name without one is a bare table.
    pub fn parse(target: &str) -> Self {
        match target.rsplit_once('.') {
            Some((table, column)) => Self {
                table: table.to_string(),
                column: Some(column.to_string()),
            },
            None => Self {
                table: target.to_string(),
                column: None,
            },
        }
    }
}
