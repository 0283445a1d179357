//! Expression trees for extended SQL clauses
//!
//! Every value-bearing piece of an extended statement (attribute values,
//! feature columns, call-like clauses) is an [`Expr`]. The layout follows
//! Lisp S-expressions: a compound node is headed by a literal naming its
//! operator, callee or bracket, and the remaining children are its operands.
//!
//! Nodes are only built through the constructors on [`Expr`], which enforce
//! arity and bracket rules. Once built a tree is immutable, so it can be
//! rendered from several threads at once.

use std::convert::Infallible;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Classification of a literal: a lexer token class or a bracket marker.
///
/// Bracket markers carry the ASCII code of the bracket as their code, the
/// token classes take small integers. Code `0` is reserved and never maps to
/// a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum ExprKind {
    Number = 1,
    Ident = 2,
    String = 3,
    Operator = 4,
    /// `(`
    OpenParen = '(' as u32,
    /// `[`
    OpenBracket = '[' as u32,
}

impl ExprKind {
    /// Code reserved for unconstructed nodes.
    pub const RESERVED: u32 = 0;

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn is_bracket(self) -> bool {
        Bracket::from_kind(self).is_some()
    }
}

impl TryFrom<u32> for ExprKind {
    type Error = ExprError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(ExprKind::Number),
            2 => Ok(ExprKind::Ident),
            3 => Ok(ExprKind::String),
            4 => Ok(ExprKind::Operator),
            c if c == '(' as u32 => Ok(ExprKind::OpenParen),
            c if c == '[' as u32 => Ok(ExprKind::OpenBracket),
            _ => Err(ExprError::InvalidKind(code)),
        }
    }
}

impl TryFrom<char> for ExprKind {
    type Error = ExprError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            '(' => Ok(ExprKind::OpenParen),
            '[' => Ok(ExprKind::OpenBracket),
            _ => Err(ExprError::InvalidKind(c as u32)),
        }
    }
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExprKind::Number => "NUMBER",
            ExprKind::Ident => "IDENT",
            ExprKind::String => "STRING",
            ExprKind::Operator => "OPERATOR",
            ExprKind::OpenParen => "(",
            ExprKind::OpenBracket => "[",
        };
        f.write_str(name)
    }
}

/// The two list brackets a variadic expression may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Bracket {
    Square,
    Paren,
}

impl Bracket {
    pub fn from_kind(kind: ExprKind) -> Option<Self> {
        match kind {
            ExprKind::OpenBracket => Some(Bracket::Square),
            ExprKind::OpenParen => Some(Bracket::Paren),
            _ => None,
        }
    }

    pub fn kind(self) -> ExprKind {
        match self {
            Bracket::Square => ExprKind::OpenBracket,
            Bracket::Paren => ExprKind::OpenParen,
        }
    }

    pub fn open(self) -> char {
        match self {
            Bracket::Square => '[',
            Bracket::Paren => '(',
        }
    }

    pub fn close(self) -> char {
        match self {
            Bracket::Square => ']',
            Bracket::Paren => ')',
        }
    }
}

/// Which operand a unary or binary builder found missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Unary,
    Left,
    Right,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Unary => f.write_str("operand of a unary expression"),
            Operand::Left => f.write_str("left operand of a binary expression"),
            Operand::Right => f.write_str("right operand of a binary expression"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("kind {0} is reserved or unknown and cannot classify a literal")]
    InvalidKind(u32),

    #[error("the {operand} is missing")]
    NilOperand { operand: Operand },

    #[error("a variadic expression needs a [ or ( marker matching its symbol, got kind code {code} with symbol {symbol:?}")]
    InvalidBracketKind { code: u32, symbol: String },

    #[error("bracket marker {kind} cannot head a {shape} expression")]
    UnexpectedBracket { kind: ExprKind, shape: &'static str },

    #[error("internal shape violation: {0}")]
    InternalShapeViolation(String),
}

impl From<Infallible> for ExprError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// A terminal node: a classification plus its exact source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Literal {
    kind: ExprKind,
    value: String,
}

impl Literal {
    fn new<K>(kind: K, value: impl Into<String>) -> Result<Self, ExprError>
    where
        K: TryInto<ExprKind>,
        ExprError: From<K::Error>,
    {
        Ok(Self {
            kind: kind.try_into()?,
            value: value.into(),
        })
    }

    /// Operator literal of a unary or binary node. Brackets are reserved for
    /// variadic heads.
    fn head<K>(kind: K, value: impl Into<String>, shape: &'static str) -> Result<Self, ExprError>
    where
        K: TryInto<ExprKind>,
        ExprError: From<K::Error>,
    {
        let literal = Self::new(kind, value)?;
        if literal.kind.is_bracket() {
            return Err(ExprError::UnexpectedBracket {
                kind: literal.kind,
                shape,
            });
        }
        Ok(literal)
    }

    pub fn kind(&self) -> ExprKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// An interior node. The head literal is child 0; operands follow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Compound {
    head: Literal,
    operands: Vec<Expr>,
    is_call: bool,
}

impl Compound {
    pub fn head(&self) -> &Literal {
        &self.head
    }

    pub fn operands(&self) -> &[Expr] {
        &self.operands
    }

    pub fn is_call(&self) -> bool {
        self.is_call
    }

    /// Number of children, head included.
    pub fn child_count(&self) -> usize {
        self.operands.len() + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Expr {
    Literal(Literal),
    Compound(Compound),
}

/// Logical shape of a node, derived from its structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape<'a> {
    Literal(&'a Literal),
    Unary {
        op: &'a Literal,
        operand: &'a Expr,
    },
    Binary {
        op: &'a Literal,
        left: &'a Expr,
        right: &'a Expr,
    },
    Variadic {
        bracket: Bracket,
        items: &'a [Expr],
    },
    Funcall {
        name: &'a Literal,
        args: &'a [Expr],
    },
}

impl Shape<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Literal(_) => "literal",
            Shape::Unary { .. } => "unary",
            Shape::Binary { .. } => "binary",
            Shape::Variadic { .. } => "variadic",
            Shape::Funcall { .. } => "funcall",
        }
    }
}

impl Expr {
    /// Build a literal. Fails with [`ExprError::InvalidKind`] for code 0 or
    /// any code outside [`ExprKind`].
    pub fn literal<K>(kind: K, value: impl Into<String>) -> Result<Self, ExprError>
    where
        K: TryInto<ExprKind>,
        ExprError: From<K::Error>,
    {
        Ok(Expr::Literal(Literal::new(kind, value)?))
    }

    pub fn unary<K>(kind: K, op: impl Into<String>, operand: Option<Expr>) -> Result<Self, ExprError>
    where
        K: TryInto<ExprKind>,
        ExprError: From<K::Error>,
    {
        let head = Literal::head(kind, op, "unary")?;
        let operand = operand.ok_or(ExprError::NilOperand {
            operand: Operand::Unary,
        })?;
        Ok(Expr::Compound(Compound {
            head,
            operands: vec![operand],
            is_call: false,
        }))
    }

    pub fn binary<K>(
        kind: K,
        op: impl Into<String>,
        left: Option<Expr>,
        right: Option<Expr>,
    ) -> Result<Self, ExprError>
    where
        K: TryInto<ExprKind>,
        ExprError: From<K::Error>,
    {
        let head = Literal::head(kind, op, "binary")?;
        let left = left.ok_or(ExprError::NilOperand {
            operand: Operand::Left,
        })?;
        let right = right.ok_or(ExprError::NilOperand {
            operand: Operand::Right,
        })?;
        Ok(Expr::Compound(Compound {
            head,
            operands: vec![left, right],
            is_call: false,
        }))
    }

    /// Build a `[...]` or `(...)` list. `bracket` must be the single
    /// character of `kind`. Any other kind, reserved and unknown codes
    /// included, fails with [`ExprError::InvalidBracketKind`].
    pub fn variadic<K>(kind: K, bracket: impl Into<String>, operands: Vec<Expr>) -> Result<Self, ExprError>
    where
        K: TryInto<ExprKind>,
        ExprError: From<K::Error>,
    {
        let symbol = bracket.into();
        let kind = match kind.try_into().map_err(ExprError::from) {
            Ok(kind) => kind,
            Err(ExprError::InvalidKind(code)) => {
                return Err(ExprError::InvalidBracketKind { code, symbol });
            }
            Err(err) => return Err(err),
        };
        let matches = Bracket::from_kind(kind).is_some_and(|b| {
            let mut chars = symbol.chars();
            chars.next() == Some(b.open()) && chars.next().is_none()
        });
        if !matches {
            return Err(ExprError::InvalidBracketKind {
                code: kind.code(),
                symbol,
            });
        }
        Ok(Expr::Compound(Compound {
            head: Literal { kind, value: symbol },
            operands,
            is_call: false,
        }))
    }

    pub fn funcall<K>(kind: K, name: impl Into<String>, args: Vec<Expr>) -> Result<Self, ExprError>
    where
        K: TryInto<ExprKind>,
        ExprError: From<K::Error>,
    {
        Ok(Expr::Compound(Compound {
            head: Literal::new(kind, name)?,
            operands: args,
            is_call: true,
        }))
    }

    /// Classify this node. Only a node built around the constructors can fail.
    pub fn shape(&self) -> Result<Shape<'_>, ExprError> {
        let compound = match self {
            Expr::Literal(literal) => return Ok(Shape::Literal(literal)),
            Expr::Compound(compound) => compound,
        };
        let head = &compound.head;

        if compound.is_call {
            return Ok(Shape::Funcall {
                name: head,
                args: &compound.operands,
            });
        }
        if let Some(bracket) = Bracket::from_kind(head.kind) {
            return Ok(Shape::Variadic {
                bracket,
                items: &compound.operands,
            });
        }
        match compound.operands.as_slice() {
            [operand] => Ok(Shape::Unary { op: head, operand }),
            [left, right] => Ok(Shape::Binary { op: head, left, right }),
            other => Err(ExprError::InternalShapeViolation(format!(
                "non-call compound headed by {} {:?} has {} children",
                head.kind,
                head.value,
                other.len() + 1
            ))),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }

    pub fn is_unary(&self) -> bool {
        matches!(self.shape(), Ok(Shape::Unary { .. }))
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.shape(), Ok(Shape::Binary { .. }))
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self.shape(), Ok(Shape::Variadic { .. }))
    }

    pub fn is_funcall(&self) -> bool {
        matches!(self.shape(), Ok(Shape::Funcall { .. }))
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expr::Literal(literal) => Some(literal),
            Expr::Compound(_) => None,
        }
    }

    /// Reconstruct source-equivalent text.
    ///
    /// Binary nodes render as `left op right`, unary as `op operand`, lists
    /// and call arguments are joined with `", "`. Literal text is copied as
    /// is, without quoting or escaping.
    pub fn render(&self) -> Result<String, ExprError> {
        let mut out = String::new();
        self.render_into(&mut out)?;
        Ok(out)
    }

    fn render_into(&self, out: &mut String) -> Result<(), ExprError> {
        let shape = match self.shape() {
            Ok(shape) => shape,
            Err(err) => {
                tracing::error!(error = %err, node = ?self, "expression violates its shape invariants");
                return Err(err);
            }
        };

        match shape {
            Shape::Literal(literal) => out.push_str(&literal.value),
            Shape::Unary { op, operand } => {
                out.push_str(&op.value);
                out.push(' ');
                operand.render_into(out)?;
            }
            Shape::Binary { op, left, right } => {
                left.render_into(out)?;
                out.push(' ');
                out.push_str(&op.value);
                out.push(' ');
                right.render_into(out)?;
            }
            Shape::Variadic { bracket, items } => {
                out.push(bracket.open());
                render_list(items, out)?;
                out.push(bracket.close());
            }
            Shape::Funcall { name, args } => {
                out.push_str(&name.value);
                out.push('(');
                render_list(args, out)?;
                out.push(')');
            }
        }
        Ok(())
    }
}

fn render_list(items: &[Expr], out: &mut String) -> Result<(), ExprError> {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.render_into(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: &str) -> Expr {
        Expr::literal(ExprKind::Number, v).unwrap()
    }

    fn ident(v: &str) -> Expr {
        Expr::literal(ExprKind::Ident, v).unwrap()
    }

    fn shape_count(e: &Expr) -> usize {
        [e.is_literal(), e.is_unary(), e.is_binary(), e.is_variadic(), e.is_funcall()]
            .iter()
            .filter(|b| **b)
            .count()
    }

    #[test]
    fn test_literal_renders_value() {
        let e = Expr::literal(ExprKind::String, "\"hello\"").unwrap();
        assert!(e.is_literal());
        assert_eq!(e.render().unwrap(), "\"hello\"");
        assert_eq!(e.as_literal().unwrap().kind(), ExprKind::String);
    }

    #[test]
    fn test_reserved_kind_rejected() {
        assert_eq!(Expr::literal(0u32, "x"), Err(ExprError::InvalidKind(0)));
        assert_eq!(Expr::literal(99u32, "x"), Err(ExprError::InvalidKind(99)));
        assert_eq!(
            Expr::unary(ExprKind::RESERVED, "-", Some(num("1"))),
            Err(ExprError::InvalidKind(0))
        );
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(ExprKind::try_from(91u32), Ok(ExprKind::OpenBracket));
        assert_eq!(ExprKind::try_from(40u32), Ok(ExprKind::OpenParen));
        assert_eq!(ExprKind::OpenBracket.code(), '[' as u32);
        assert_eq!(ExprKind::try_from('x'), Err(ExprError::InvalidKind('x' as u32)));
    }

    #[test]
    fn test_binary_render() {
        let e = Expr::binary(ExprKind::Operator, "+", Some(num("3")), Some(num("4"))).unwrap();
        assert!(e.is_binary());
        assert_eq!(shape_count(&e), 1);
        assert_eq!(e.render().unwrap(), "3 + 4");
    }

    #[test]
    fn test_unary_render() {
        let e = Expr::unary(ExprKind::Operator, "-", Some(num("5"))).unwrap();
        assert!(e.is_unary());
        assert_eq!(shape_count(&e), 1);
        assert_eq!(e.render().unwrap(), "- 5");
    }

    #[test]
    fn test_variadic_render() {
        let list = Expr::variadic('[', "[", vec![num("1"), num("2"), num("3")]).unwrap();
        assert!(list.is_variadic());
        assert_eq!(list.render().unwrap(), "[1, 2, 3]");

        let tuple = Expr::variadic(ExprKind::OpenParen, "(", vec![ident("a")]).unwrap();
        assert_eq!(tuple.render().unwrap(), "(a)");

        let empty = Expr::variadic(ExprKind::OpenBracket, "[", vec![]).unwrap();
        assert!(empty.is_variadic());
        assert_eq!(empty.render().unwrap(), "[]");
    }

    #[test]
    fn test_funcall_render() {
        let dense = Expr::funcall(ExprKind::Ident, "dense", vec![num("128")]).unwrap();
        assert!(dense.is_funcall());
        assert_eq!(dense.render().unwrap(), "dense(128)");

        let sum = Expr::funcall(ExprKind::Ident, "sum", vec![ident("a"), ident("b")]).unwrap();
        assert_eq!(sum.render().unwrap(), "sum(a, b)");

        let now = Expr::funcall(ExprKind::Ident, "now", vec![]).unwrap();
        assert_eq!(now.render().unwrap(), "now()");
    }

    #[test]
    fn test_funcall_with_two_args_is_not_binary() {
        // Same child count as a binary node; the call flag decides.
        let e = Expr::funcall(ExprKind::Ident, "pow", vec![num("2"), num("8")]).unwrap();
        assert!(e.is_funcall());
        assert!(!e.is_binary());
        assert_eq!(shape_count(&e), 1);
    }

    #[test]
    fn test_nested_render() {
        let list = Expr::variadic('[', "[", vec![num("1"), num("2")]).unwrap();
        let neg = Expr::unary(ExprKind::Operator, "-", Some(ident("x"))).unwrap();
        let call = Expr::funcall(ExprKind::Ident, "max", vec![list, neg]).unwrap();
        let e = Expr::binary(ExprKind::Operator, "*", Some(call), Some(num("3"))).unwrap();
        assert_eq!(e.render().unwrap(), "max([1, 2], - x) * 3");
    }

    #[test]
    fn test_nil_operands() {
        assert_eq!(
            Expr::unary(ExprKind::Operator, "NOT", None),
            Err(ExprError::NilOperand { operand: Operand::Unary })
        );
        assert_eq!(
            Expr::binary(ExprKind::Operator, "+", None, Some(num("1"))),
            Err(ExprError::NilOperand { operand: Operand::Left })
        );
        let err = Expr::binary(ExprKind::Operator, "+", Some(num("1")), None).unwrap_err();
        assert_eq!(err, ExprError::NilOperand { operand: Operand::Right });
        assert_eq!(err.to_string(), "the right operand of a binary expression is missing");
    }

    #[test]
    fn test_variadic_rejects_non_bracket_kind() {
        let err = Expr::variadic(ExprKind::Operator, "+", vec![]).unwrap_err();
        assert!(matches!(err, ExprError::InvalidBracketKind { code: 4, .. }));
    }

    #[test]
    fn test_variadic_rejects_raw_non_bracket_codes() {
        assert_eq!(
            Expr::variadic(0u32, "(", vec![]),
            Err(ExprError::InvalidBracketKind {
                code: 0,
                symbol: "(".to_string(),
            })
        );
        assert_eq!(
            Expr::variadic('+' as u32, "+", vec![num("1")]),
            Err(ExprError::InvalidBracketKind {
                code: '+' as u32,
                symbol: "+".to_string(),
            })
        );
        assert!(matches!(
            Expr::variadic('x', "x", vec![]),
            Err(ExprError::InvalidBracketKind { .. })
        ));
    }

    #[test]
    fn test_variadic_rejects_mismatched_symbol() {
        let err = Expr::variadic(ExprKind::OpenParen, "[", vec![]).unwrap_err();
        assert_eq!(
            err,
            ExprError::InvalidBracketKind {
                code: '(' as u32,
                symbol: "[".to_string(),
            }
        );
        assert!(Expr::variadic(ExprKind::OpenBracket, "[[", vec![]).is_err());
        assert!(Expr::variadic(ExprKind::OpenBracket, "", vec![]).is_err());
    }

    #[test]
    fn test_bracket_kind_cannot_head_operators() {
        let err = Expr::unary(ExprKind::OpenParen, "(", Some(num("1"))).unwrap_err();
        assert_eq!(
            err,
            ExprError::UnexpectedBracket {
                kind: ExprKind::OpenParen,
                shape: "unary",
            }
        );
        assert_eq!(
            Expr::binary('[', "[", Some(num("1")), Some(num("2"))),
            Err(ExprError::UnexpectedBracket {
                kind: ExprKind::OpenBracket,
                shape: "binary",
            })
        );
    }

    #[test]
    fn test_funcall_accepts_any_callee_kind() {
        let e = Expr::funcall(ExprKind::OpenParen, "f", vec![]).unwrap();
        assert!(e.is_funcall());
        assert!(!e.is_variadic());
        assert_eq!(shape_count(&e), 1);
        assert_eq!(e.render().unwrap(), "f()");
        assert_eq!(Expr::funcall(0u32, "f", vec![]), Err(ExprError::InvalidKind(0)));
    }

    #[test]
    fn test_broken_compound_reports_violation() {
        let broken = Expr::Compound(Compound {
            head: Literal {
                kind: ExprKind::Operator,
                value: "+".to_string(),
            },
            operands: vec![num("1"), num("2"), num("3")],
            is_call: false,
        });
        assert_eq!(shape_count(&broken), 0);
        assert!(matches!(broken.render(), Err(ExprError::InternalShapeViolation(_))));

        let outer = Expr::funcall(ExprKind::Ident, "f", vec![broken]).unwrap();
        assert!(matches!(outer.render(), Err(ExprError::InternalShapeViolation(_))));
    }

    #[test]
    fn test_compound_accessors() {
        let e = Expr::binary(ExprKind::Operator, "AND", Some(ident("a")), Some(ident("b"))).unwrap();
        let Expr::Compound(c) = &e else {
            panic!("expected compound");
        };
        assert_eq!(c.head().value(), "AND");
        assert_eq!(c.child_count(), 3);
        assert!(!c.is_call());
        assert_eq!(e.shape().unwrap().name(), "binary");
    }

    #[test]
    fn test_trees_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Expr>();

        let e = Expr::funcall(ExprKind::Ident, "dense", vec![num("128")]).unwrap();
        std::thread::scope(|s| {
            let a = s.spawn(|| e.render().unwrap());
            let b = s.spawn(|| e.render().unwrap());
            assert_eq!(a.join().unwrap(), b.join().unwrap());
        });
    }

    #[test]
    fn test_serialize_tree() {
        let e = Expr::unary(ExprKind::Operator, "-", Some(num("5"))).unwrap();
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["node"], "compound");
        assert_eq!(json["head"]["value"], "-");
        assert_eq!(json["operands"][0]["kind"], "number");
    }
}
