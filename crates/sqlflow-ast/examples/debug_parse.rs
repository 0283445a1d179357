use pest::Parser;
use sqlflow_ast::parser::{Rule, SqlFlowParser};

fn main() {
    let input = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "dense(128, activation = \"relu\") * -2".to_string());
    match SqlFlowParser::parse(Rule::expression, &input) {
        Ok(pairs) => {
            for pair in pairs {
                print_pair(&pair, 0);
            }
        }
        Err(e) => println!("Error: {}", e),
    }

    match sqlflow_ast::parse_expression(&input) {
        Ok(expr) => match expr.render() {
            Ok(text) => println!("rendered: {}", text),
            Err(e) => println!("render error: {}", e),
        },
        Err(e) => println!("build error: {}", e),
    }
}

fn print_pair(pair: &pest::iterators::Pair<Rule>, indent: usize) {
    let indent_str = "  ".repeat(indent);
    println!("{}Rule::{:?} = {:?}", indent_str, pair.as_rule(), pair.as_str());
    for inner in pair.clone().into_inner() {
        print_pair(&inner, indent + 1);
    }
}
