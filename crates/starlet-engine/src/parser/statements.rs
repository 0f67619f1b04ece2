//! Statement grammar.
//!
//! ```text
//! File        = {Statement | NEWLINE} EOF .
//! Statement   = DefStmt | IfStmt | ForStmt | WhileStmt | SimpleStmt .
//! DefStmt     = 'def' identifier '(' [Parameters [',']] ')' ':' Suite .
//! Parameters  = Parameter {',' Parameter} .
//! Parameter   = identifier | identifier '=' Test | '*' identifier | '**' identifier .
//! IfStmt      = 'if' Test ':' Suite {'elif' Test ':' Suite} ['else' ':' Suite] .
//! ForStmt     = 'for' LoopVariables 'in' Expression ':' Suite .
//! WhileStmt   = 'while' Test ':' Suite .
//! Suite       = [newline indent {Statement} outdent] | SimpleStmt .
//! SimpleStmt  = SmallStmt {';' SmallStmt} [';'] '\n' .
//! SmallStmt   = ReturnStmt | BreakStmt | ContinueStmt | PassStmt
//!             | AssignStmt | ExprStmt .
//! ```
//!
//! `elif` chains are represented as an `if` nested in the `else` branch. A
//! leading string literal in a `def` body becomes its doc string.
