//! Property-based tests for expression trees
//!
//! Trees built from random constructor sequences must classify into exactly
//! one shape, and text rendered from a parsed tree must parse back into a
//! tree of the same shape.

use proptest::prelude::*;
use sqlflow_ast::{parse_expression, Expr, ExprKind, Shape};

const KEYWORDS: &[&str] = &[
    "to", "train", "predict", "explain", "evaluate", "with", "column", "for", "label", "into",
    "using", "and", "or", "not",
];

fn identifier() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,6}".prop_filter("not a keyword", |s| !KEYWORDS.contains(&s.as_str()))
}

// Strategy for leaves built through the literal constructor
fn literal() -> impl Strategy<Value = Expr> {
    prop_oneof![
        "[0-9]{1,4}".prop_map(|v| Expr::literal(ExprKind::Number, v).unwrap()),
        identifier().prop_map(|v| Expr::literal(ExprKind::Ident, v).unwrap()),
        "\"[a-z ]{0,6}\"".prop_map(|v| Expr::literal(ExprKind::String, v).unwrap()),
    ]
}

// Strategy for trees built through every constructor
fn constructed_tree() -> impl Strategy<Value = Expr> {
    literal().prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            (prop_oneof![Just("-"), Just("NOT")], inner.clone())
                .prop_map(|(op, e)| Expr::unary(ExprKind::Operator, op, Some(e)).unwrap()),
            (
                prop_oneof![Just("+"), Just("*"), Just("="), Just("AND")],
                inner.clone(),
                inner.clone()
            )
                .prop_map(|(op, l, r)| Expr::binary(ExprKind::Operator, op, Some(l), Some(r)).unwrap()),
            (any::<bool>(), prop::collection::vec(inner.clone(), 0..4)).prop_map(|(square, items)| {
                if square {
                    Expr::variadic(ExprKind::OpenBracket, "[", items).unwrap()
                } else {
                    Expr::variadic(ExprKind::OpenParen, "(", items).unwrap()
                }
            }),
            (identifier(), prop::collection::vec(inner, 0..4))
                .prop_map(|(name, args)| Expr::funcall(ExprKind::Ident, name, args).unwrap()),
        ]
    })
}

// Strategy for well-formed expression source text
fn expression_source() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        "[0-9]{1,3}(\\.[0-9]{1,2})?".boxed(),
        identifier().boxed(),
        "\"[a-z]{0,4}\"".boxed(),
    ];
    leaf.prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (
                inner.clone(),
                prop_oneof![
                    Just("+"),
                    Just("-"),
                    Just("*"),
                    Just("/"),
                    Just("%"),
                    Just("^"),
                    Just("="),
                    Just("<="),
                    Just("!="),
                    Just("AND"),
                    Just("OR")
                ],
                inner.clone()
            )
                .prop_map(|(l, op, r)| format!("{l} {op} {r}")),
            (prop_oneof![Just("-"), Just("NOT")], inner.clone()).prop_map(|(op, e)| format!("{op} {e}")),
            prop::collection::vec(inner.clone(), 0..3).prop_map(|items| format!("[{}]", items.join(", "))),
            prop::collection::vec(inner.clone(), 1..3).prop_map(|items| format!("({})", items.join(", "))),
            (identifier(), prop::collection::vec(inner, 0..3))
                .prop_map(|(name, args)| format!("{name}({})", args.join(", "))),
        ]
    })
}

fn shape_count(e: &Expr) -> usize {
    [e.is_literal(), e.is_unary(), e.is_binary(), e.is_variadic(), e.is_funcall()]
        .iter()
        .filter(|b| **b)
        .count()
}

fn children(e: &Expr) -> &[Expr] {
    match e {
        Expr::Literal(_) => &[],
        Expr::Compound(c) => c.operands(),
    }
}

fn all_nodes_have_one_shape(e: &Expr) -> bool {
    shape_count(e) == 1 && children(e).iter().all(all_nodes_have_one_shape)
}

/// Shape names and head text of every node, in pre-order.
fn signature(e: &Expr) -> String {
    let shape = e.shape().unwrap();
    let head = match shape {
        Shape::Literal(l) => l.value().to_string(),
        Shape::Unary { op, .. } | Shape::Binary { op, .. } => op.value().to_string(),
        Shape::Variadic { bracket, .. } => bracket.open().to_string(),
        Shape::Funcall { name, .. } => name.value().to_string(),
    };
    let inner: Vec<String> = children(e).iter().map(signature).collect();
    format!("{}({})[{}]", shape.name(), head, inner.join(","))
}

proptest! {
    /// Property: every node of a constructed tree has exactly one shape
    #[test]
    fn prop_shapes_are_exclusive(tree in constructed_tree()) {
        prop_assert!(all_nodes_have_one_shape(&tree));
    }

    /// Property: constructed trees always render
    #[test]
    fn prop_constructed_trees_render(tree in constructed_tree()) {
        prop_assert!(tree.render().is_ok());
    }

    /// Property: a literal renders to its exact value
    #[test]
    fn prop_literal_renders_value(value in "[ -~]{0,12}", code in prop_oneof![Just(1u32), Just(2u32), Just(3u32), Just(4u32)]) {
        let e = Expr::literal(code, value.clone()).unwrap();
        prop_assert!(e.is_literal());
        prop_assert_eq!(e.render().unwrap(), value);
    }

    /// Property: rendering then reparsing keeps the shape of every node
    #[test]
    fn prop_render_reparse_keeps_shape(source in expression_source()) {
        let parsed = parse_expression(&source);
        prop_assume!(parsed.is_ok());
        let tree = parsed.unwrap();

        let rendered = tree.render().unwrap();
        let reparsed = parse_expression(&rendered).unwrap();

        prop_assert_eq!(signature(&tree), signature(&reparsed));
        prop_assert_eq!(reparsed.render().unwrap(), rendered);
        prop_assert!(all_nodes_have_one_shape(&reparsed));
    }
}
