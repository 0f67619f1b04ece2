//! The main parser implementation.

use crate::ast::*;
use crate::error::{StaticError, StaticErrors};
use crate::lexer::{Position, Scanner, Token, TokenKind};
use crate::options::FileOptions;

type ParseResult<T> = std::result::Result<T, StaticError>;

/// Deepest nesting of blocks and expressions a file may contain.
pub const MAX_NESTING: usize = 200;

/// A recursive descent parser.
///
/// Nesting is bounded so that neither the parser nor the passes that walk
/// the tree afterwards can exhaust the native stack. `depth` counts the
/// levels currently open; `deepest` is the lowest level the tree under
/// construction reaches, which also accounts for left-leaning chains such
/// as `a + b + c` or `f()()` that are built in a loop.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
    deepest: usize,
}

impl Parser {
    /// Tokenizes the source and prepares a parser over it.
    pub fn new(source: &str) -> ParseResult<Self> {
        let mut scanner = Scanner::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = scanner.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(Self {
            tokens,
            current: 0,
            depth: 0,
            deepest: 0,
        })
    }

    /// Parses a whole file.
    pub fn parse_file(path: &str, source: &str, options: FileOptions) -> Result<File, StaticErrors> {
        let wrap = |err: StaticError| StaticErrors::single(path, err);
        let mut parser = Parser::new(source).map_err(wrap)?;
        let stmts = parser.parse_statements().map_err(wrap)?;
        Ok(File {
            path: path.to_string(),
            stmts,
            options,
            module: None,
        })
    }

    /// Parses statements until end of input.
    pub fn parse_statements(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::Eof) {
            if self.check(&TokenKind::Newline) {
                self.advance();
                continue;
            }
            self.parse_statement(&mut stmts)?;
        }
        Ok(stmts)
    }

    /// Parses a single expression (with optional trailing newline).
    pub fn parse_expression_only(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_expr_list()?;
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
        if !self.check(&TokenKind::Eof) {
            return Err(self.unexpected("after expression"));
        }
        Ok(expr)
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek_kind_at(&self, offset: usize) -> &TokenKind {
        let index = (self.current + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn pos(&self) -> Position {
        self.peek().pos
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> ParseResult<Position> {
        if self.check(kind) {
            Ok(self.advance().pos)
        } else {
            Err(self.unexpected(&format!("expected {}", kind.describe())))
        }
    }

    // ========================================================================
    // Nesting
    // ========================================================================

    /// Opens one level of nesting.
    fn enter(&mut self, pos: Position) -> ParseResult<()> {
        self.reach(pos, self.depth + 1)?;
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Records that the tree reaches `level`.
    fn reach(&mut self, pos: Position, level: usize) -> ParseResult<()> {
        if level > MAX_NESTING {
            return Err(StaticError::new(
                pos,
                format!("nesting exceeds {} levels", MAX_NESTING),
            ));
        }
        self.deepest = self.deepest.max(level);
        Ok(())
    }

    /// Starts measuring the height of the next subtree.
    fn mark(&mut self) -> usize {
        std::mem::replace(&mut self.deepest, self.depth)
    }

    /// Returns the height reached since `mark` and resumes outer tracking.
    fn measure(&mut self, mark: usize) -> usize {
        let height = self.deepest - self.depth;
        self.deepest = self.deepest.max(mark);
        height
    }

    fn unexpected(&self, context: &str) -> StaticError {
        StaticError::new(
            self.pos(),
            format!("got {}, {}", self.peek().kind.describe(), context),
        )
    }

    fn expect_ident(&mut self) -> ParseResult<Ident> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Ident::new(name, token.pos))
            }
            _ => Err(self.unexpected("want identifier")),
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_statement(&mut self, out: &mut Vec<Stmt>) -> ParseResult<()> {
        match &self.peek().kind {
            TokenKind::Def => out.push(self.parse_def()?),
            TokenKind::If => out.push(self.parse_if()?),
            TokenKind::For => out.push(self.parse_for()?),
            TokenKind::While => out.push(self.parse_while()?),
            TokenKind::Indent => return Err(StaticError::new(self.pos(), "unexpected indent")),
            _ => self.parse_simple_statements(out)?,
        }
        Ok(())
    }

    /// Parses `small_stmt {';' small_stmt} [';'] NEWLINE`.
    fn parse_simple_statements(&mut self, out: &mut Vec<Stmt>) -> ParseResult<()> {
        loop {
            out.push(self.parse_small_statement()?);
            if !self.eat(&TokenKind::Semicolon) {
                break;
            }
            if self.check(&TokenKind::Newline) || self.check(&TokenKind::Eof) {
                break;
            }
        }
        if !self.eat(&TokenKind::Newline) && !self.check(&TokenKind::Eof) {
            return Err(self.unexpected("expected newline"));
        }
        Ok(())
    }

    fn parse_small_statement(&mut self) -> ParseResult<Stmt> {
        let pos = self.pos();
        match self.peek().kind {
            TokenKind::Return => {
                self.advance();
                let result = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expr_list()?)
                };
                return Ok(Stmt::Return(ReturnStmt { pos, result }));
            }
            TokenKind::Break | TokenKind::Continue | TokenKind::Pass => {
                let kind = match self.advance().kind {
                    TokenKind::Break => BranchKind::Break,
                    TokenKind::Continue => BranchKind::Continue,
                    _ => BranchKind::Pass,
                };
                return Ok(Stmt::Branch(BranchStmt { pos, kind }));
            }
            _ => {}
        }

        let lhs = self.parse_expr_list()?;
        let op_pos = self.pos();
        let op = match self.peek().kind {
            TokenKind::Eq => None,
            TokenKind::PlusEq => Some(BinaryOp::Plus),
            TokenKind::MinusEq => Some(BinaryOp::Minus),
            TokenKind::StarEq => Some(BinaryOp::Star),
            TokenKind::SlashEq => Some(BinaryOp::Slash),
            TokenKind::SlashSlashEq => Some(BinaryOp::SlashSlash),
            TokenKind::PercentEq => Some(BinaryOp::Percent),
            TokenKind::AmpEq => Some(BinaryOp::Amp),
            TokenKind::PipeEq => Some(BinaryOp::Pipe),
            TokenKind::CaretEq => Some(BinaryOp::Caret),
            TokenKind::LtLtEq => Some(BinaryOp::Shl),
            TokenKind::GtGtEq => Some(BinaryOp::Shr),
            _ => return Ok(Stmt::Expr(ExprStmt { expr: lhs })),
        };
        self.advance();
        check_assign_target(&lhs, op.is_some())?;
        let rhs = self.parse_expr_list()?;
        Ok(Stmt::Assign(AssignStmt { op_pos, op, lhs, rhs }))
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof
        )
    }

    /// Parses `simple_stmt | NEWLINE INDENT {statement} OUTDENT`.
    fn parse_suite(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut body = Vec::new();
        self.enter(self.pos())?;
        if !self.eat(&TokenKind::Newline) {
            self.parse_simple_statements(&mut body)?;
            self.leave();
            return Ok(body);
        }
        self.expect(&TokenKind::Indent)?;
        while !self.check(&TokenKind::Outdent) && !self.check(&TokenKind::Eof) {
            self.parse_statement(&mut body)?;
        }
        self.eat(&TokenKind::Outdent);
        self.leave();
        Ok(body)
    }

    fn parse_def(&mut self) -> ParseResult<Stmt> {
        let pos = self.expect(&TokenKind::Def)?;
        let name = self.expect_ident()?;
        self.expect(&TokenKind::LeftParen)?;
        let params = self.parse_params(&TokenKind::RightParen)?;
        self.expect(&TokenKind::RightParen)?;
        self.expect(&TokenKind::Colon)?;
        let body = self.parse_suite()?;
        let doc = match body.first() {
            Some(Stmt::Expr(ExprStmt {
                expr:
                    Expr::Literal(Literal {
                        value: LiteralValue::String(doc),
                        ..
                    }),
            })) => Some(doc.clone()),
            _ => None,
        };
        Ok(Stmt::Def(DefStmt {
            pos,
            name,
            params,
            body,
            doc,
            function: None,
        }))
    }

    fn parse_params(&mut self, close: &TokenKind) -> ParseResult<Vec<Param>> {
        let mut params = Vec::new();
        let mut seen_optional = false;
        let mut seen_args = false;
        let mut seen_kwargs = false;
        while !self.check(close) {
            let pos = self.pos();
            if seen_kwargs {
                return Err(StaticError::new(pos, "parameter may not follow **kwargs"));
            }
            let param = if self.eat(&TokenKind::StarStar) {
                seen_kwargs = true;
                Param::Kwargs(self.expect_ident()?)
            } else if self.eat(&TokenKind::Star) {
                if seen_args {
                    return Err(StaticError::new(pos, "multiple * parameters not allowed"));
                }
                seen_args = true;
                Param::Args(self.expect_ident()?)
            } else {
                if seen_args {
                    return Err(StaticError::new(pos, "keyword-only parameters are not supported"));
                }
                let ident = self.expect_ident()?;
                if self.eat(&TokenKind::Eq) {
                    seen_optional = true;
                    Param::Optional(ident, self.parse_test()?)
                } else {
                    if seen_optional {
                        return Err(StaticError::new(pos, "required parameter may not follow optional"));
                    }
                    Param::Required(ident)
                }
            };
            params.push(param);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let pos = self.advance().pos; // 'if' or 'elif'
        let cond = self.parse_test()?;
        self.expect(&TokenKind::Colon)?;
        let then_body = self.parse_suite()?;
        let else_body = if self.check(&TokenKind::Elif) {
            self.enter(self.pos())?;
            let elif = self.parse_if()?;
            self.leave();
            vec![elif]
        } else if self.eat(&TokenKind::Else) {
            self.expect(&TokenKind::Colon)?;
            self.parse_suite()?
        } else {
            Vec::new()
        };
        Ok(Stmt::If(IfStmt {
            pos,
            cond,
            then_body,
            else_body,
        }))
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let pos = self.expect(&TokenKind::For)?;
        let vars = self.parse_loop_variables()?;
        check_assign_target(&vars, false)?;
        self.expect(&TokenKind::In)?;
        let iterable = self.parse_expr_list()?;
        self.expect(&TokenKind::Colon)?;
        let body = self.parse_suite()?;
        Ok(Stmt::For(ForStmt {
            pos,
            vars,
            iterable,
            body,
        }))
    }

    /// Loop variables are primary expressions, so that `in` is not consumed
    /// as a comparison operator.
    fn parse_loop_variables(&mut self) -> ParseResult<Expr> {
        let first = self.parse_primary()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut elems = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.check(&TokenKind::In) {
                break;
            }
            elems.push(self.parse_primary()?);
        }
        Ok(Expr::Tuple(TupleExpr { lparen: None, elems }))
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let pos = self.expect(&TokenKind::While)?;
        let cond = self.parse_test()?;
        self.expect(&TokenKind::Colon)?;
        let body = self.parse_suite()?;
        Ok(Stmt::While(WhileStmt { pos, cond, body }))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Parses `test {',' test} [',']`, producing an unparenthesized tuple if
    /// any comma is present.
    fn parse_expr_list(&mut self) -> ParseResult<Expr> {
        let first = self.parse_test()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut elems = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at_expr_list_end() {
                break;
            }
            elems.push(self.parse_test()?);
        }
        Ok(Expr::Tuple(TupleExpr { lparen: None, elems }))
    }

    fn at_expr_list_end(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Newline
                | TokenKind::Eof
                | TokenKind::Semicolon
                | TokenKind::RightParen
                | TokenKind::RightBracket
                | TokenKind::RightBrace
                | TokenKind::Colon
                | TokenKind::Eq
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::SlashSlashEq
                | TokenKind::PercentEq
                | TokenKind::AmpEq
                | TokenKind::PipeEq
                | TokenKind::CaretEq
                | TokenKind::LtLtEq
                | TokenKind::GtGtEq
        )
    }

    /// Parses `lambda | or_test ['if' or_test 'else' test]`.
    fn parse_test(&mut self) -> ParseResult<Expr> {
        self.enter(self.pos())?;
        let expr = self.parse_test_inner()?;
        self.leave();
        Ok(expr)
    }

    fn parse_test_inner(&mut self) -> ParseResult<Expr> {
        if self.check(&TokenKind::Lambda) {
            return self.parse_lambda();
        }
        let then_expr = self.parse_binary(1)?;
        if !self.check(&TokenKind::If) {
            return Ok(then_expr);
        }
        let if_pos = self.advance().pos;
        let cond = self.parse_binary(1)?;
        if !self.eat(&TokenKind::Else) {
            return Err(self.unexpected("expected 'else' in conditional expression"));
        }
        let else_expr = self.parse_test()?;
        Ok(Expr::Cond(CondExpr {
            if_pos,
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        }))
    }

    fn parse_lambda(&mut self) -> ParseResult<Expr> {
        let pos = self.expect(&TokenKind::Lambda)?;
        let params = self.parse_params(&TokenKind::Colon)?;
        self.expect(&TokenKind::Colon)?;
        let body = self.parse_test()?;
        Ok(Expr::Lambda(LambdaExpr {
            pos,
            params,
            body: Box::new(body),
            function: None,
        }))
    }

    /// Returns the binary operator at the cursor, its precedence and the
    /// number of tokens it spans.
    fn binary_operator(&self) -> Option<(BinaryOp, u8, usize)> {
        let op = match self.peek().kind {
            TokenKind::Or => (BinaryOp::Or, 1, 1),
            TokenKind::And => (BinaryOp::And, 2, 1),
            TokenKind::EqEq => (BinaryOp::Eq, 4, 1),
            TokenKind::NotEq => (BinaryOp::Ne, 4, 1),
            TokenKind::Lt => (BinaryOp::Lt, 4, 1),
            TokenKind::Le => (BinaryOp::Le, 4, 1),
            TokenKind::Gt => (BinaryOp::Gt, 4, 1),
            TokenKind::Ge => (BinaryOp::Ge, 4, 1),
            TokenKind::In => (BinaryOp::In, 4, 1),
            TokenKind::Not if self.peek_kind_at(1) == &TokenKind::In => (BinaryOp::NotIn, 4, 2),
            TokenKind::Pipe => (BinaryOp::Pipe, 5, 1),
            TokenKind::Caret => (BinaryOp::Caret, 6, 1),
            TokenKind::Amp => (BinaryOp::Amp, 7, 1),
            TokenKind::LtLt => (BinaryOp::Shl, 8, 1),
            TokenKind::GtGt => (BinaryOp::Shr, 8, 1),
            TokenKind::Plus => (BinaryOp::Plus, 9, 1),
            TokenKind::Minus => (BinaryOp::Minus, 9, 1),
            TokenKind::Star => (BinaryOp::Star, 10, 1),
            TokenKind::Slash => (BinaryOp::Slash, 10, 1),
            TokenKind::SlashSlash => (BinaryOp::SlashSlash, 10, 1),
            TokenKind::Percent => (BinaryOp::Percent, 10, 1),
            _ => return None,
        };
        Some(op)
    }

    /// Precedence climbing over the binary operators. Level 3 is the unary
    /// `not`, which binds looser than comparisons.
    fn parse_binary(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mark = self.mark();
        let mut x = if min_prec <= 3 && self.check(&TokenKind::Not) {
            let op_pos = self.advance().pos;
            self.enter(op_pos)?;
            let operand = self.parse_binary(3)?;
            self.leave();
            Expr::Unary(UnaryExpr {
                op: UnaryOp::Not,
                op_pos,
                x: Box::new(operand),
            })
        } else {
            self.parse_unary()?
        };
        let mut height = self.measure(mark);

        let mut last_comparison: Option<BinaryOp> = None;
        while let Some((op, prec, width)) = self.binary_operator() {
            if prec < min_prec {
                break;
            }
            let op_pos = self.pos();
            if prec == 4 {
                if let Some(prev) = last_comparison {
                    return Err(StaticError::new(
                        op_pos,
                        format!("{} does not associate with {} (use parens)", prev, op),
                    ));
                }
                last_comparison = Some(op);
            }
            for _ in 0..width {
                self.advance();
            }
            let mark = self.mark();
            let y = self.parse_binary(prec + 1)?;
            height = height.max(self.measure(mark)) + 1;
            self.reach(op_pos, self.depth + height)?;
            x = Expr::Binary(BinaryExpr {
                op,
                op_pos,
                x: Box::new(x),
                y: Box::new(y),
            });
        }
        Ok(x)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Tilde => UnaryOp::Tilde,
            _ => return self.parse_primary(),
        };
        let op_pos = self.advance().pos;
        self.enter(op_pos)?;
        let x = self.parse_unary()?;
        self.leave();
        Ok(Expr::Unary(UnaryExpr {
            op,
            op_pos,
            x: Box::new(x),
        }))
    }

    /// Parses an operand followed by any number of index or call suffixes.
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let mark = self.mark();
        let mut x = self.parse_operand()?;
        let mut height = self.measure(mark);
        loop {
            match self.peek().kind {
                TokenKind::LeftBracket => {
                    let lbrack = self.advance().pos;
                    let mark = self.mark();
                    if self.check(&TokenKind::Colon) {
                        return Err(StaticError::new(self.pos(), "slice expressions are not supported"));
                    }
                    let index = self.parse_expr_list()?;
                    if self.check(&TokenKind::Colon) {
                        return Err(StaticError::new(self.pos(), "slice expressions are not supported"));
                    }
                    self.expect(&TokenKind::RightBracket)?;
                    height = height.max(self.measure(mark)) + 1;
                    self.reach(lbrack, self.depth + height)?;
                    x = Expr::Index(IndexExpr {
                        x: Box::new(x),
                        lbrack,
                        index: Box::new(index),
                    });
                }
                TokenKind::LeftParen => {
                    let lparen = self.advance().pos;
                    let mark = self.mark();
                    let args = self.parse_args()?;
                    self.expect(&TokenKind::RightParen)?;
                    height = height.max(self.measure(mark)) + 1;
                    self.reach(lparen, self.depth + height)?;
                    x = Expr::Call(CallExpr {
                        func: Box::new(x),
                        lparen,
                        args,
                    });
                }
                TokenKind::Dot => {
                    return Err(StaticError::new(self.pos(), "attribute access is not supported"));
                }
                _ => return Ok(x),
            }
        }
    }

    fn parse_args(&mut self) -> ParseResult<Vec<Arg>> {
        let mut args = Vec::new();
        let mut seen_named = false;
        let mut seen_star = false;
        let mut seen_starstar = false;
        while !self.check(&TokenKind::RightParen) {
            let pos = self.pos();
            if seen_starstar {
                return Err(StaticError::new(pos, "argument may not follow **kwargs"));
            }
            let arg = if self.eat(&TokenKind::StarStar) {
                seen_starstar = true;
                Arg::StarStar(self.parse_test()?)
            } else if self.eat(&TokenKind::Star) {
                if seen_star {
                    return Err(StaticError::new(pos, "multiple *args not allowed"));
                }
                seen_star = true;
                Arg::Star(self.parse_test()?)
            } else if matches!(self.peek().kind, TokenKind::Identifier(_))
                && self.peek_kind_at(1) == &TokenKind::Eq
            {
                let name = self.expect_ident()?;
                self.advance(); // '='
                seen_named = true;
                Arg::Named(name, self.parse_test()?)
            } else {
                if seen_named {
                    return Err(StaticError::new(pos, "positional argument may not follow named"));
                }
                if seen_star {
                    return Err(StaticError::new(pos, "positional argument may not follow *args"));
                }
                Arg::Positional(self.parse_test()?)
            };
            if seen_star && matches!(arg, Arg::Named(..)) {
                return Err(StaticError::new(pos, "named argument may not follow *args"));
            }
            args.push(arg);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(args)
    }

    fn parse_operand(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        let pos = token.pos;
        let literal = |value| -> ParseResult<Expr> { Ok(Expr::Literal(Literal { pos, value })) };
        match token.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::Ident(Ident::new(name, pos)))
            }
            TokenKind::Int(value) => {
                self.advance();
                literal(LiteralValue::Int(value))
            }
            TokenKind::Float(value) => {
                self.advance();
                literal(LiteralValue::Float(value))
            }
            TokenKind::String(value) => {
                self.advance();
                literal(LiteralValue::String(value))
            }
            TokenKind::Bytes(value) => {
                self.advance();
                literal(LiteralValue::Bytes(value))
            }
            TokenKind::LeftParen => {
                self.advance();
                if self.eat(&TokenKind::RightParen) {
                    return Ok(Expr::Tuple(TupleExpr {
                        lparen: Some(pos),
                        elems: Vec::new(),
                    }));
                }
                let inner = self.parse_expr_list()?;
                self.expect(&TokenKind::RightParen)?;
                match inner {
                    Expr::Tuple(TupleExpr { lparen: None, elems }) => Ok(Expr::Tuple(TupleExpr {
                        lparen: Some(pos),
                        elems,
                    })),
                    other => Ok(other),
                }
            }
            TokenKind::LeftBracket => {
                self.advance();
                let mut elems = Vec::new();
                while !self.check(&TokenKind::RightBracket) {
                    elems.push(self.parse_test()?);
                    if self.check(&TokenKind::For) {
                        return Err(StaticError::new(self.pos(), "comprehensions are not supported"));
                    }
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RightBracket)?;
                Ok(Expr::List(ListExpr { lbrack: pos, elems }))
            }
            TokenKind::LeftBrace => {
                self.advance();
                let mut entries = Vec::new();
                while !self.check(&TokenKind::RightBrace) {
                    let key = self.parse_test()?;
                    let colon = self.expect(&TokenKind::Colon)?;
                    let value = self.parse_test()?;
                    entries.push(DictEntry { colon, key, value });
                    if self.check(&TokenKind::For) {
                        return Err(StaticError::new(self.pos(), "comprehensions are not supported"));
                    }
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RightBrace)?;
                Ok(Expr::Dict(DictExpr { lbrace: pos, entries }))
            }
            _ => Err(self.unexpected("expected expression")),
        }
    }
}

/// Checks that an expression may appear on the left of an assignment.
fn check_assign_target(expr: &Expr, augmented: bool) -> ParseResult<()> {
    match expr {
        Expr::Ident(_) | Expr::Index(_) => Ok(()),
        Expr::Tuple(TupleExpr { elems, .. }) | Expr::List(ListExpr { elems, .. }) if !augmented => {
            if elems.is_empty() {
                return Err(StaticError::new(expr.pos(), "cannot assign to empty sequence"));
            }
            elems.iter().try_for_each(|e| check_assign_target(e, false))
        }
        Expr::Tuple(_) | Expr::List(_) => Err(StaticError::new(
            expr.pos(),
            "cannot use sequence in augmented assignment",
        )),
        _ => Err(StaticError::new(expr.pos(), "cannot assign to this expression")),
    }
}
