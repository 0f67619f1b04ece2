//! Checks enabled by `strict_multi_value_return`.
//!
//! - An assignment with a single target may not receive an unparenthesized
//!   tuple (`x = 1, 2`).
//! - Every reachable `return` of a function yields the same number of values.
//!   A bare `return` counts as one value; `return a, b` counts as two. A
//!   function that falls off its end is not counted.

use crate::ast::{AssignStmt, Expr, Stmt, TupleExpr};
use crate::error::StaticError;

/// Message for a single-target assignment of an implicit tuple.
pub const IMPLICIT_TUPLE: &str = "implicit tuple not allowed; use parentheses or brackets";

/// Rejects `x = 1, 2` and `x += 1, 2`; multi-target unpacking is allowed.
pub fn check_implicit_tuple(assign: &AssignStmt) -> Option<StaticError> {
    let single_target = matches!(assign.lhs, Expr::Ident(_) | Expr::Index(_));
    if single_target && assign.rhs.is_implicit_tuple() {
        return Some(StaticError::new(assign.rhs.pos(), IMPLICIT_TUPLE));
    }
    None
}

/// The number of values a return statement yields.
fn return_count(result: Option<&Expr>) -> usize {
    match result {
        Some(Expr::Tuple(TupleExpr { lparen: None, elems })) => elems.len(),
        _ => 1,
    }
}

/// Checks that all reachable returns in a function body agree on their value
/// count. Nested functions are checked separately.
pub fn check_return_counts(body: &[Stmt]) -> Option<StaticError> {
    let mut checker = ReturnCounts::default();
    checker.block(body);
    checker.error
}

#[derive(Default)]
struct ReturnCounts {
    first: Option<usize>,
    error: Option<StaticError>,
}

impl ReturnCounts {
    /// Walks a block; returns whether control can reach its end.
    fn block(&mut self, stmts: &[Stmt]) -> bool {
        for stmt in stmts {
            if !self.stmt(stmt) {
                return false;
            }
        }
        true
    }

    fn stmt(&mut self, stmt: &Stmt) -> bool {
        match stmt {
            Stmt::Return(ret) => {
                let count = return_count(ret.result.as_ref());
                match self.first {
                    None => self.first = Some(count),
                    Some(first) if first != count && self.error.is_none() => {
                        self.error = Some(StaticError::new(
                            ret.pos,
                            format!(
                                "multi-value return count mismatch: found {} and {} values",
                                first, count
                            ),
                        ));
                    }
                    Some(_) => {}
                }
                false
            }
            Stmt::Branch(branch) => branch.kind == crate::ast::BranchKind::Pass,
            Stmt::If(s) => {
                let then_falls = self.block(&s.then_body);
                let else_falls = self.block(&s.else_body);
                then_falls || else_falls
            }
            Stmt::For(s) => {
                self.block(&s.body);
                true
            }
            Stmt::While(s) => {
                self.block(&s.body);
                true
            }
            Stmt::Assign(_) | Stmt::Expr(_) | Stmt::Def(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FileOptions;
    use crate::parser::Parser;

    fn body_of(src: &str) -> Vec<Stmt> {
        let file = Parser::parse_file("t.star", src, FileOptions::default()).expect("Should parse");
        match file.stmts.into_iter().next() {
            Some(Stmt::Def(def)) => def.body,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_consistent_counts() {
        let body = body_of("def f(x):\n  if x:\n    return 1, 2\n  return 3, 4\n");
        assert!(check_return_counts(&body).is_none());
    }

    #[test]
    fn test_bare_return_counts_as_one() {
        let body = body_of("def f(x):\n  if x:\n    return 1, 2\n  return\n");
        let err = check_return_counts(&body).expect("mismatch");
        assert_eq!(err.msg, "multi-value return count mismatch: found 2 and 1 values");
    }

    #[test]
    fn test_unreachable_return_ignored() {
        let body = body_of("def f():\n  return 1, 2\n  return 1\n");
        assert!(check_return_counts(&body).is_none());
    }

    #[test]
    fn test_parenthesized_tuple_counts_as_one() {
        let body = body_of("def f(x):\n  if x:\n    return (1, 2)\n  return 3\n");
        assert!(check_return_counts(&body).is_none());
    }

    #[test]
    fn test_fall_through_exempt() {
        let body = body_of("def f(x):\n  if x:\n    return 1, 2\n");
        assert!(check_return_counts(&body).is_none());
    }
}
