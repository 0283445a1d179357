//! AST types for extended SQL statements
//!
//! A statement is standard SQL kept verbatim plus an optional extended
//! clause. Everything value-bearing inside a clause is an [`Expr`].

use serde::Serialize;

use crate::expr::{Expr, ExprError};

/// Target used by a `COLUMN` clause without `FOR`.
pub const DEFAULT_FEATURE_TARGET: &str = "feature_columns";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    /// Full statement text as written, without the trailing `;`.
    pub original_sql: String,
    /// The standard SQL part preceding the extended clause.
    pub standard_select: String,
    pub extension: Option<Extension>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "clause", rename_all = "snake_case")]
pub enum Extension {
    Train(TrainClause),
    Predict(PredictClause),
    Explain(ExplainClause),
    Evaluate(EvaluateClause),
}

/// `name = expr` inside a `WITH` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: Expr,
}

/// One `COLUMN a, b, ... [FOR target]` clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnClause {
    pub columns: Vec<Expr>,
    pub target: Option<String>,
}

impl ColumnClause {
    pub fn target_name(&self) -> &str {
        self.target.as_deref().unwrap_or(DEFAULT_FEATURE_TARGET)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainClause {
    pub estimator: String,
    pub attributes: Vec<Attribute>,
    pub columns: Vec<ColumnClause>,
    pub label: Option<String>,
    pub save: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictClause {
    /// `table[.column]` receiving predictions.
    pub result: String,
    pub attributes: Vec<Attribute>,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainClause {
    pub model: String,
    pub attributes: Vec<Attribute>,
    pub explainer: Option<String>,
    pub into: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluateClause {
    pub model: String,
    pub attributes: Vec<Attribute>,
    pub label: Option<String>,
    pub into: String,
}

impl Statement {
    pub fn is_extended(&self) -> bool {
        self.extension.is_some()
    }

    /// Canonical text: the standard part followed by the rendered clause.
    pub fn render(&self) -> Result<String, ExprError> {
        match &self.extension {
            Some(ext) => Ok(format!("{} {}", self.standard_select, ext.render()?)),
            None => Ok(self.standard_select.clone()),
        }
    }
}

impl Extension {
    pub fn attributes(&self) -> &[Attribute] {
        match self {
            Extension::Train(c) => &c.attributes,
            Extension::Predict(c) => &c.attributes,
            Extension::Explain(c) => &c.attributes,
            Extension::Evaluate(c) => &c.attributes,
        }
    }

    /// Render the clause with uppercase keywords and `", "` separators.
    pub fn render(&self) -> Result<String, ExprError> {
        let mut parts = Vec::new();
        match self {
            Extension::Train(c) => {
                parts.push(format!("TO TRAIN {}", c.estimator));
                push_attributes(&mut parts, &c.attributes)?;
                for column in &c.columns {
                    let mut text = format!("COLUMN {}", render_exprs(&column.columns)?);
                    if let Some(target) = &column.target {
                        text.push_str(" FOR ");
                        text.push_str(target);
                    }
                    parts.push(text);
                }
                if let Some(label) = &c.label {
                    parts.push(format!("LABEL {label}"));
                }
                parts.push(format!("INTO {}", c.save));
            }
            Extension::Predict(c) => {
                parts.push(format!("TO PREDICT {}", c.result));
                push_attributes(&mut parts, &c.attributes)?;
                parts.push(format!("USING {}", c.model));
            }
            Extension::Explain(c) => {
                parts.push(format!("TO EXPLAIN {}", c.model));
                push_attributes(&mut parts, &c.attributes)?;
                if let Some(explainer) = &c.explainer {
                    parts.push(format!("USING {explainer}"));
                }
                if let Some(into) = &c.into {
                    parts.push(format!("INTO {into}"));
                }
            }
            Extension::Evaluate(c) => {
                parts.push(format!("TO EVALUATE {}", c.model));
                push_attributes(&mut parts, &c.attributes)?;
                if let Some(label) = &c.label {
                    parts.push(format!("LABEL {label}"));
                }
                parts.push(format!("INTO {}", c.into));
            }
        }
        Ok(parts.join(" "))
    }
}

fn push_attributes(parts: &mut Vec<String>, attributes: &[Attribute]) -> Result<(), ExprError> {
    if attributes.is_empty() {
        return Ok(());
    }
    let rendered = attributes
        .iter()
        .map(|a| -> Result<_, ExprError> { Ok(format!("{} = {}", a.name, a.value.render()?)) })
        .collect::<Result<Vec<_>, _>>()?;
    parts.push(format!("WITH {}", rendered.join(", ")));
    Ok(())
}

fn render_exprs(exprs: &[Expr]) -> Result<String, ExprError> {
    let rendered = exprs.iter().map(Expr::render).collect::<Result<Vec<_>, _>>()?;
    Ok(rendered.join(", "))
}
