//! Expression grammar.
//!
//! Binary operators, loosest first:
//!
//! | Level | Operators |
//! |-------|-----------|
//! | 1 | `or` |
//! | 2 | `and` |
//! | 3 | `not` (unary) |
//! | 4 | `==` `!=` `<` `>` `<=` `>=` `in` `not in` |
//! | 5 | `\|` |
//! | 6 | `^` |
//! | 7 | `&` |
//! | 8 | `<<` `>>` |
//! | 9 | `+` `-` |
//! | 10 | `*` `/` `//` `%` |
//!
//! Comparisons do not associate: `a < b < c` is a syntax error.
//!
//! ```text
//! Expression = Test {',' Test} [','] .
//! Test       = LambdaExpr | IfExpr | BinaryExpr .
//! IfExpr     = BinaryExpr 'if' BinaryExpr 'else' Test .
//! LambdaExpr = 'lambda' [Parameters] ':' Test .
//! UnaryExpr  = ('+' | '-' | '~') UnaryExpr | PrimaryExpr .
//! PrimaryExpr = Operand {'[' Expression ']' | '(' [Arguments] ')'} .
//! Operand    = identifier | int | float | string | bytes
//!            | '(' [Expression] ')' | '[' [Test {',' Test} [',']] ']'
//!            | '{' [Entry {',' Entry} [',']] '}' .
//! ```
//!
//! An unparenthesized comma list produces a [`TupleExpr`](crate::ast::TupleExpr)
//! with no `lparen`; the resolver uses this to find implicit tuples.

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::lexer::Position;
    use crate::parser::Parser;

    fn parse_expr(src: &str) -> Expr {
        let mut parser = Parser::new(src).expect("Should scan");
        parser.parse_expression_only().expect("Should parse")
    }

    fn parse_expr_err(src: &str) -> String {
        let mut parser = Parser::new(src).expect("Should scan");
        parser.parse_expression_only().expect_err("Should fail").msg
    }

    #[test]
    fn test_precedence_mul_over_add() {
        match parse_expr("1 + 2 * 3") {
            Expr::Binary(b) => {
                assert_eq!(b.op, BinaryOp::Plus);
                assert!(matches!(*b.y, Expr::Binary(ref m) if m.op == BinaryOp::Star));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_not_binds_looser_than_comparison() {
        match parse_expr("not a == b") {
            Expr::Unary(u) => {
                assert_eq!(u.op, UnaryOp::Not);
                assert!(matches!(*u.x, Expr::Binary(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_not_in_operator() {
        assert!(matches!(parse_expr("a not in b"), Expr::Binary(b) if b.op == BinaryOp::NotIn));
    }

    #[test]
    fn test_comparison_does_not_associate() {
        assert_eq!(parse_expr_err("a < b < c"), "< does not associate with < (use parens)");
    }

    #[test]
    fn test_operator_position() {
        match parse_expr("x * y") {
            Expr::Binary(b) => assert_eq!(b.op_pos, Position::new(1, 3)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_call_position_is_lparen() {
        match parse_expr("f (1, k=2, *a, **kw)") {
            Expr::Call(c) => {
                assert_eq!(c.lparen, Position::new(1, 3));
                assert_eq!(c.args.len(), 4);
                assert!(matches!(&c.args[1], Arg::Named(id, _) if id.name == "k"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parenthesized_tuple_records_lparen() {
        match parse_expr("(1, 2)") {
            Expr::Tuple(t) => {
                assert_eq!(t.lparen, Some(Position::new(1, 1)));
                assert_eq!(t.elems.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse_expr("1, 2").is_implicit_tuple());
        assert!(matches!(parse_expr("(1)"), Expr::Literal(_)));
        assert!(matches!(parse_expr("()"), Expr::Tuple(t) if t.elems.is_empty()));
    }

    #[test]
    fn test_conditional_and_lambda() {
        assert!(matches!(parse_expr("a if c else b"), Expr::Cond(_)));
        assert!(matches!(parse_expr("lambda x, y=1: x + y"), Expr::Lambda(l) if l.params.len() == 2));
    }

    #[test]
    fn test_collections_and_index() {
        assert!(matches!(parse_expr("[1, 2, 3,]"), Expr::List(l) if l.elems.len() == 3));
        assert!(matches!(parse_expr("{1: 2, 3: 4}"), Expr::Dict(d) if d.entries.len() == 2));
        assert!(matches!(parse_expr("x[0][1]"), Expr::Index(_)));
    }

    #[test]
    fn test_positional_after_named() {
        assert_eq!(parse_expr_err("f(a=1, 2)"), "positional argument may not follow named");
    }

    #[test]
    fn test_unsupported_forms() {
        assert!(parse_expr_err("x.y").contains("attribute"));
        assert!(parse_expr_err("[x for x in y]").contains("comprehensions"));
        assert!(parse_expr_err("x[1:2]").contains("slice"));
    }

    #[test]
    fn test_deep_parentheses_are_rejected() {
        let depth = 50_000;
        let src = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse_expr_err(&src), "nesting exceeds 200 levels");
    }

    #[test]
    fn test_long_chains_are_rejected() {
        let sum = format!("1{}", " + 1".repeat(50_000));
        assert_eq!(parse_expr_err(&sum), "nesting exceeds 200 levels");
        let calls = format!("f{}", "()".repeat(50_000));
        assert_eq!(parse_expr_err(&calls), "nesting exceeds 200 levels");
        let negations = format!("{}1", "-".repeat(50_000));
        assert_eq!(parse_expr_err(&negations), "nesting exceeds 200 levels");
        let nots = format!("{}x", "not ".repeat(50_000));
        assert_eq!(parse_expr_err(&nots), "nesting exceeds 200 levels");
        let conds = format!("{}c", "a if c else ".repeat(50_000));
        assert_eq!(parse_expr_err(&conds), "nesting exceeds 200 levels");
    }

    #[test]
    fn test_moderate_nesting_is_accepted() {
        let parens = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert!(matches!(parse_expr(&parens), Expr::Literal(_)));
        let sum = format!("1{}", " + 1".repeat(100));
        assert!(matches!(parse_expr(&sum), Expr::Binary(_)));
        // A flat list does not nest, however long.
        let list = format!("[{}]", "1, ".repeat(10_000));
        assert!(matches!(parse_expr(&list), Expr::List(l) if l.elems.len() == 10_000));
    }
}
