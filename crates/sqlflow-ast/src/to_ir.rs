//! Convert AST to canonical IR

use sqlflow_ir::{self as ir};
use tracing::debug;

use crate::ast::*;
use crate::expr::{Bracket, Expr, ExprError, ExprKind, Shape};

/// Lower a whole program; the first render failure aborts.
pub fn program_to_ir(statements: Vec<Statement>) -> Result<ir::Program, ExprError> {
    let statements = statements
        .into_iter()
        .map(Statement::to_ir)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ir::Program { statements })
}

impl Statement {
    /// Convert AST Statement to IR Statement
    pub fn to_ir(self) -> Result<ir::Statement, ExprError> {
        let Statement {
            original_sql,
            standard_select: select,
            extension,
        } = self;

        let stmt = match extension {
            None => ir::Statement::Standard { sql: select },
            Some(Extension::Train(c)) => ir::Statement::Train(ir::TrainStmt {
                original_sql,
                select,
                estimator: c.estimator,
                attributes: attributes_to_ir(c.attributes)?,
                features: features_to_ir(c.columns)?,
                label: c.label,
                into: c.save,
            }),
            Some(Extension::Predict(c)) => ir::Statement::Predict(ir::PredictStmt {
                original_sql,
                select,
                result: ir::ResultTarget::parse(&c.result),
                attributes: attributes_to_ir(c.attributes)?,
                using: c.model,
            }),
            Some(Extension::Explain(c)) => ir::Statement::Explain(ir::ExplainStmt {
                original_sql,
                select,
                model: c.model,
                attributes: attributes_to_ir(c.attributes)?,
                explainer: c.explainer,
                into: c.into,
            }),
            Some(Extension::Evaluate(c)) => ir::Statement::Evaluate(ir::EvaluateStmt {
                original_sql,
                select,
                model: c.model,
                attributes: attributes_to_ir(c.attributes)?,
                label: c.label,
                into: c.into,
            }),
        };

        debug!(select = %stmt.select(), "lowered statement to IR");
        Ok(stmt)
    }
}

impl Expr {
    /// Render into an IR attribute value.
    pub fn to_ir(&self) -> Result<ir::AttributeValue, ExprError> {
        Ok(ir::AttributeValue {
            kind: value_kind(self)?,
            text: self.render()?,
        })
    }
}

fn value_kind(expr: &Expr) -> Result<ir::ValueKind, ExprError> {
    let kind = match expr.shape()? {
        Shape::Literal(literal) => match literal.kind() {
            ExprKind::Number => ir::ValueKind::Number,
            ExprKind::Ident => ir::ValueKind::Ident,
            ExprKind::String => ir::ValueKind::String,
            ExprKind::Operator | ExprKind::OpenParen | ExprKind::OpenBracket => ir::ValueKind::Operator,
        },
        Shape::Unary { .. } => ir::ValueKind::Unary,
        Shape::Binary { .. } => ir::ValueKind::Binary,
        Shape::Variadic {
            bracket: Bracket::Square,
            ..
        } => ir::ValueKind::List,
        Shape::Variadic {
            bracket: Bracket::Paren,
            ..
        } => ir::ValueKind::Tuple,
        Shape::Funcall { .. } => ir::ValueKind::Call,
    };
    Ok(kind)
}

fn attributes_to_ir(attributes: Vec<Attribute>) -> Result<ir::Attributes, ExprError> {
    attributes
        .into_iter()
        .map(|a| -> Result<_, ExprError> { Ok((a.name, a.value.to_ir()?)) })
        .collect()
}

/// Group rendered columns by target; clauses sharing a target are merged
/// in source order.
fn features_to_ir(columns: Vec<ColumnClause>) -> Result<ir::FeatureColumns, ExprError> {
    let mut features = ir::FeatureColumns::new();
    for clause in columns {
        let rendered = clause
            .columns
            .iter()
            .map(Expr::render)
            .collect::<Result<Vec<_>, _>>()?;
        features
            .entry(clause.target_name().to_string())
            .or_default()
            .extend(rendered);
    }
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_statement;

    #[test]
    fn test_train_to_ir() {
        let stmt = parse_statement(
            "SELECT * FROM iris.train TO TRAIN DNNClassifier \
             WITH model.n_classes = 3, model.hidden_units = [10, 20] \
             COLUMN sepal_length, sepal_width COLUMN petal_length FOR extra \
             COLUMN petal_width \
             LABEL class INTO sqlflow_models.my_dnn_model;",
        )
        .unwrap();

        let ir::Statement::Train(train) = stmt.to_ir().unwrap() else {
            panic!("expected train statement");
        };
        assert_eq!(train.select, "SELECT * FROM iris.train");
        assert_eq!(train.estimator, "DNNClassifier");
        assert_eq!(train.attributes["model.n_classes"].kind, ir::ValueKind::Number);
        assert_eq!(train.attributes["model.hidden_units"].text, "[10, 20]");
        assert_eq!(train.attributes["model.hidden_units"].kind, ir::ValueKind::List);
        assert_eq!(
            train.features["feature_columns"],
            vec!["sepal_length", "sepal_width", "petal_width"]
        );
        assert_eq!(train.features["extra"], vec!["petal_length"]);
        assert_eq!(train.label.as_deref(), Some("class"));
        assert_eq!(train.into, "sqlflow_models.my_dnn_model");
    }

    #[test]
    fn test_standard_to_ir() {
        let stmt = parse_statement("SELECT 1").unwrap();
        assert_eq!(
            stmt.to_ir().unwrap(),
            ir::Statement::Standard {
                sql: "SELECT 1".to_string()
            }
        );
    }

    #[test]
    fn test_value_kinds() {
        let cases = [
            ("3", ir::ValueKind::Number),
            ("\"x\"", ir::ValueKind::String),
            ("a.b", ir::ValueKind::Ident),
            ("- 1", ir::ValueKind::Unary),
            ("1 + 1", ir::ValueKind::Binary),
            ("(1, 2)", ir::ValueKind::Tuple),
            ("f(x)", ir::ValueKind::Call),
        ];
        for (source, kind) in cases {
            let value = crate::parser::parse_expression(source).unwrap().to_ir().unwrap();
            assert_eq!(value.kind, kind, "{source}");
            assert_eq!(value.text, source);
        }
    }
}
