//! Pest-based parser for extended SQL
//!
//! The grammar reduces expressions bottom-up and every node goes through the
//! [`Expr`] constructors, so a constructor failure surfaces as a
//! [`ParseError::Expr`] for the offending statement.

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;
use tracing::debug;

use crate::ast::*;
use crate::expr::{Expr, ExprError, ExprKind};

#[derive(Parser)]
#[grammar = "sqlflow.pest"]
pub struct SqlFlowParser;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Invalid expression: {0}")]
    Expr(#[from] ExprError),

    #[error("Duplicate attribute: {0}")]
    DuplicateAttribute(String),

    #[error("Pest error: {0}")]
    Pest(#[from] pest::error::Error<Rule>),
}

/// Parse a single expression, e.g. an attribute value.
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    let mut pairs = SqlFlowParser::parse(Rule::expression, source)?;
    let expression = pairs.next().ok_or_else(|| ParseError::Syntax("Empty input".to_string()))?;
    let expr = next_pair(&mut expression.into_inner(), "expression")?;
    build_expr(expr)
}

/// Parse one statement with an optional trailing `;`.
pub fn parse_statement(source: &str) -> Result<Statement, ParseError> {
    let mut pairs = SqlFlowParser::parse(Rule::statement, source)?;
    let statement = pairs.next().ok_or_else(|| ParseError::Syntax("Empty input".to_string()))?;
    let body = next_pair(&mut statement.into_inner(), "statement")?;
    parse_statement_body(body)
}

/// Parse a `;`-separated sequence of statements.
pub fn parse_program(source: &str) -> Result<Vec<Statement>, ParseError> {
    let mut pairs = SqlFlowParser::parse(Rule::program, source)?;
    let program = pairs.next().ok_or_else(|| ParseError::Syntax("Empty input".to_string()))?;

    let statements = program
        .into_inner()
        .filter(|p| p.as_rule() == Rule::statement_body)
        .map(parse_statement_body)
        .collect::<Result<Vec<_>, _>>()?;

    debug!(statements = statements.len(), "parsed program");
    Ok(statements)
}

fn parse_statement_body(pair: Pair<Rule>) -> Result<Statement, ParseError> {
    let original_sql = pair.as_str().trim().to_string();
    let mut inner = pair.into_inner();
    let standard_select = next_pair(&mut inner, "standard SQL")?.as_str().trim().to_string();
    let extension = inner.next().map(parse_extension).transpose()?;

    debug!(
        extended = extension.is_some(),
        sql = %original_sql,
        "parsed statement"
    );

    Ok(Statement {
        original_sql,
        standard_select,
        extension,
    })
}

fn parse_extension(pair: Pair<Rule>) -> Result<Extension, ParseError> {
    match pair.as_rule() {
        Rule::train_clause => parse_train(pair).map(Extension::Train),
        Rule::predict_clause => parse_predict(pair).map(Extension::Predict),
        Rule::explain_clause => parse_explain(pair).map(Extension::Explain),
        Rule::evaluate_clause => parse_evaluate(pair).map(Extension::Evaluate),
        rule => Err(ParseError::Syntax(format!("Unknown extended clause: {:?}", rule))),
    }
}

fn parse_train(pair: Pair<Rule>) -> Result<TrainClause, ParseError> {
    let mut estimator = None;
    let mut attributes = Vec::new();
    let mut columns = Vec::new();
    let mut label = None;
    let mut save = None;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::ident => estimator = Some(part.as_str().to_string()),
            Rule::with_clause => attributes = parse_attributes(part)?,
            Rule::column_clause => columns.push(parse_column_clause(part)?),
            Rule::label_clause => label = Some(clause_operand(part)?),
            Rule::into_clause => save = Some(clause_operand(part)?),
            // Keywords
            _ => {}
        }
    }

    Ok(TrainClause {
        estimator: required(estimator, "TO TRAIN estimator")?,
        attributes,
        columns,
        label,
        save: required(save, "INTO model")?,
    })
}

fn parse_predict(pair: Pair<Rule>) -> Result<PredictClause, ParseError> {
    let mut result = None;
    let mut attributes = Vec::new();
    let mut model = None;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::ident => result = Some(part.as_str().to_string()),
            Rule::with_clause => attributes = parse_attributes(part)?,
            Rule::using_clause => model = Some(clause_operand(part)?),
            _ => {}
        }
    }

    Ok(PredictClause {
        result: required(result, "TO PREDICT result table")?,
        attributes,
        model: required(model, "USING model")?,
    })
}

fn parse_explain(pair: Pair<Rule>) -> Result<ExplainClause, ParseError> {
    let mut model = None;
    let mut attributes = Vec::new();
    let mut explainer = None;
    let mut into = None;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::ident => model = Some(part.as_str().to_string()),
            Rule::with_clause => attributes = parse_attributes(part)?,
            Rule::using_clause => explainer = Some(clause_operand(part)?),
            Rule::into_clause => into = Some(clause_operand(part)?),
            _ => {}
        }
    }

    Ok(ExplainClause {
        model: required(model, "TO EXPLAIN model")?,
        attributes,
        explainer,
        into,
    })
}

fn parse_evaluate(pair: Pair<Rule>) -> Result<EvaluateClause, ParseError> {
    let mut model = None;
    let mut attributes = Vec::new();
    let mut label = None;
    let mut into = None;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::ident => model = Some(part.as_str().to_string()),
            Rule::with_clause => attributes = parse_attributes(part)?,
            Rule::label_clause => label = Some(clause_operand(part)?),
            Rule::into_clause => into = Some(clause_operand(part)?),
            _ => {}
        }
    }

    Ok(EvaluateClause {
        model: required(model, "TO EVALUATE model")?,
        attributes,
        label,
        into: required(into, "INTO table")?,
    })
}

fn parse_attributes(pair: Pair<Rule>) -> Result<Vec<Attribute>, ParseError> {
    let mut attributes: Vec<Attribute> = Vec::new();

    for attr in pair.into_inner().filter(|p| p.as_rule() == Rule::attribute) {
        let mut inner = attr.into_inner();
        let name = next_pair(&mut inner, "attribute name")?.as_str().to_string();
        let value = build_expr(next_pair(&mut inner, "attribute value")?)?;

        if attributes.iter().any(|a| a.name == name) {
            return Err(ParseError::DuplicateAttribute(name));
        }
        attributes.push(Attribute { name, value });
    }

    Ok(attributes)
}

fn parse_column_clause(pair: Pair<Rule>) -> Result<ColumnClause, ParseError> {
    let mut columns = Vec::new();
    let mut target = None;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::expr => columns.push(build_expr(part)?),
            Rule::ident => target = Some(part.as_str().to_string()),
            _ => {}
        }
    }

    Ok(ColumnClause { columns, target })
}

/// The identifier or string following a clause keyword.
fn clause_operand(pair: Pair<Rule>) -> Result<String, ParseError> {
    let rule = pair.as_rule();
    pair.into_inner()
        .find(|p| matches!(p.as_rule(), Rule::ident | Rule::string))
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| ParseError::Syntax(format!("Missing operand in {:?}", rule)))
}

fn build_expr(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    match pair.as_rule() {
        Rule::expr => build_expr(next_pair(&mut pair.into_inner(), "expression")?),
        // Left-associative levels: operand (op operand)*
        Rule::or_expr | Rule::cmp_expr | Rule::add_expr | Rule::mul_expr | Rule::pow_expr => {
            let mut inner = pair.into_inner();
            let mut left = build_expr(next_pair(&mut inner, "left operand")?)?;

            while let Some(op) = inner.next() {
                let right = inner.next().map(build_expr).transpose()?;
                left = Expr::binary(ExprKind::Operator, op.as_str(), Some(left), right)?;
            }

            Ok(left)
        }
        Rule::not_expr | Rule::neg_expr => {
            let mut inner = pair.into_inner();
            let first = next_pair(&mut inner, "expression")?;
            match first.as_rule() {
                Rule::not_op | Rule::neg_op => {
                    let operand = inner.next().map(build_expr).transpose()?;
                    Ok(Expr::unary(ExprKind::Operator, first.as_str(), operand)?)
                }
                _ => build_expr(first),
            }
        }
        Rule::funcall => {
            let mut inner = pair.into_inner();
            let name = next_pair(&mut inner, "function name")?;
            let args = inner.map(build_expr).collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::funcall(ExprKind::Ident, name.as_str(), args)?)
        }
        Rule::list => {
            let items = pair.into_inner().map(build_expr).collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::variadic(ExprKind::OpenBracket, "[", items)?)
        }
        Rule::tuple => {
            let items = pair.into_inner().map(build_expr).collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::variadic(ExprKind::OpenParen, "(", items)?)
        }
        Rule::number => Ok(Expr::literal(ExprKind::Number, pair.as_str())?),
        Rule::string => Ok(Expr::literal(ExprKind::String, pair.as_str())?),
        Rule::ident => Ok(Expr::literal(ExprKind::Ident, pair.as_str())?),
        rule => Err(ParseError::Syntax(format!("Cannot build expression from {:?}", rule))),
    }
}

fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, what: &str) -> Result<Pair<'i, Rule>, ParseError> {
    pairs
        .next()
        .ok_or_else(|| ParseError::Syntax(format!("Missing {}", what)))
}

fn required(value: Option<String>, what: &str) -> Result<String, ParseError> {
    value.ok_or_else(|| ParseError::Syntax(format!("Missing {}", what)))
}
