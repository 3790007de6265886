//! Matcher expression: tokenizer, parser, and evaluator.
//!
//! The grammar is a small boolean language:
//!
//! ```text
//! or      := and ( "||" and )*
//! and     := unary ( "&&" unary )*
//! unary   := "!" unary | primary
//! primary := "(" or ")" | call | operand ( "==" | "!=" ) operand
//! call    := ident "(" operand "," operand ")"
//! operand := ident "." ident | "\"" chars "\""
//! ```
//!
//! Attribute references and role-function names are resolved against the
//! model at parse time, so evaluation never looks anything up by name.

use std::iter::Peekable;
use std::str::Chars;

use warden_core::{AppError, AppResult};

use super::{AttributeShape, RoleDefinition};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    LParen,
    RParen,
    Comma,
    Eq,
    Ne,
    And,
    Or,
    Not,
}

/// A value position inside a comparison or role call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// `r.<attr>`, by position in the request shape.
    Request(usize),
    /// `p.<attr>`, by position in the policy shape.
    Policy(usize),
    /// A double-quoted string literal.
    Literal(String),
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
}

/// Parsed matcher expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    /// A call to a declared role definition such as `g(r.sub, p.sub)`.
    Role {
        definition: String,
        subject: Operand,
        role: Operand,
    },
}

/// A validated matcher, ready for evaluation.
#[derive(Debug, Clone)]
pub struct Matcher {
    source: String,
    expr: Expr,
}

impl Matcher {
    /// Parse and validate a matcher expression against the model's shapes.
    pub fn parse(
        source: &str,
        request: &AttributeShape,
        policy: &AttributeShape,
        roles: &[RoleDefinition],
    ) -> AppResult<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            request,
            policy,
            roles,
        };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(AppError::configuration(format!(
                "Unexpected token {token:?} in matcher '{source}'"
            )));
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The original matcher text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The parsed expression tree.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate the matcher for one request against one policy rule.
    ///
    /// `has_role(definition, subject, role)` answers role-function calls.
    /// A value missing from either tuple makes its comparison false.
    pub fn eval<F>(&self, request: &[&str], rule: &[String], has_role: &F) -> bool
    where
        F: Fn(&str, &str, &str) -> bool,
    {
        eval_expr(&self.expr, request, rule, has_role)
    }
}

fn eval_expr<F>(expr: &Expr, request: &[&str], rule: &[String], has_role: &F) -> bool
where
    F: Fn(&str, &str, &str) -> bool,
{
    match expr {
        Expr::Or(l, r) => {
            eval_expr(l, request, rule, has_role) || eval_expr(r, request, rule, has_role)
        }
        Expr::And(l, r) => {
            eval_expr(l, request, rule, has_role) && eval_expr(r, request, rule, has_role)
        }
        Expr::Not(inner) => !eval_expr(inner, request, rule, has_role),
        Expr::Compare { left, op, right } => {
            match (resolve(left, request, rule), resolve(right, request, rule)) {
                (Some(l), Some(r)) => match op {
                    CompareOp::Eq => l == r,
                    CompareOp::Ne => l != r,
                },
                _ => false,
            }
        }
        Expr::Role {
            definition,
            subject,
            role,
        } => match (resolve(subject, request, rule), resolve(role, request, rule)) {
            (Some(s), Some(r)) => has_role(definition, s, r),
            _ => false,
        },
    }
}

fn resolve<'a>(operand: &'a Operand, request: &[&'a str], rule: &'a [String]) -> Option<&'a str> {
    match operand {
        Operand::Request(idx) => request.get(*idx).copied(),
        Operand::Policy(idx) => rule.get(*idx).map(String::as_str),
        Operand::Literal(value) => Some(value),
    }
}

fn tokenize(source: &str) -> AppResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '=' => {
                chars.next();
                expect_char(&mut chars, '=', source)?;
                tokens.push(Token::Eq);
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ne);
                } else {
                    tokens.push(Token::Not);
                }
            }
            '&' => {
                chars.next();
                expect_char(&mut chars, '&', source)?;
                tokens.push(Token::And);
            }
            '|' => {
                chars.next();
                expect_char(&mut chars, '|', source)?;
                tokens.push(Token::Or);
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(ch) => value.push(ch),
                        None => {
                            return Err(AppError::configuration(format!(
                                "Unterminated string literal in matcher '{source}'"
                            )));
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_alphanumeric() || c == '_' || c == '.' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unexpected character '{other}' in matcher '{source}'"
                )));
            }
        }
    }

    Ok(tokens)
}

fn expect_char(chars: &mut Peekable<Chars<'_>>, expected: char, source: &str) -> AppResult<()> {
    match chars.next() {
        Some(c) if c == expected => Ok(()),
        _ => Err(AppError::configuration(format!(
            "Expected '{expected}{expected}' in matcher '{source}'"
        ))),
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    request: &'a AttributeShape,
    policy: &'a AttributeShape,
    roles: &'a [RoleDefinition],
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> AppResult<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(AppError::configuration(format!(
                "Expected {expected:?} in matcher, found {token:?}"
            ))),
            None => Err(AppError::configuration(format!(
                "Expected {expected:?} in matcher, found end of input"
            ))),
        }
    }

    fn parse_or(&mut self) -> AppResult<Expr> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> AppResult<Expr> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> AppResult<Expr> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> AppResult<Expr> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let expr = self.parse_or()?;
            self.expect(Token::RParen)?;
            return Ok(expr);
        }

        if let (Some(Token::Ident(name)), Some(Token::LParen)) =
            (self.tokens.get(self.pos), self.tokens.get(self.pos + 1))
        {
            let name = name.clone();
            self.pos += 2;
            return self.parse_call(name);
        }

        let left = self.parse_operand()?;
        let op = match self.next() {
            Some(Token::Eq) => CompareOp::Eq,
            Some(Token::Ne) => CompareOp::Ne,
            other => {
                return Err(AppError::configuration(format!(
                    "Expected '==' or '!=' after operand in matcher, found {other:?}"
                )));
            }
        };
        let right = self.parse_operand()?;
        Ok(Expr::Compare { left, op, right })
    }

    fn parse_call(&mut self, name: String) -> AppResult<Expr> {
        if !self.roles.iter().any(|def| def.name == name) {
            return Err(AppError::configuration(format!(
                "Matcher calls undeclared function '{name}'"
            )));
        }
        let subject = self.parse_operand()?;
        self.expect(Token::Comma)?;
        let role = self.parse_operand()?;
        self.expect(Token::RParen)?;
        Ok(Expr::Role {
            definition: name,
            subject,
            role,
        })
    }

    fn parse_operand(&mut self) -> AppResult<Operand> {
        match self.next() {
            Some(Token::Str(value)) => Ok(Operand::Literal(value)),
            Some(Token::Ident(ident)) => self.resolve_attribute(&ident),
            other => Err(AppError::configuration(format!(
                "Expected operand in matcher, found {other:?}"
            ))),
        }
    }

    fn resolve_attribute(&self, ident: &str) -> AppResult<Operand> {
        let (key, attr) = ident.split_once('.').ok_or_else(|| {
            AppError::configuration(format!(
                "Matcher operand '{ident}' must be of the form <key>.<attribute>"
            ))
        })?;

        let undeclared =
            || AppError::configuration(format!("Matcher references undeclared attribute '{ident}'"));

        if key == self.request.key {
            self.request
                .index_of(attr)
                .map(Operand::Request)
                .ok_or_else(undeclared)
        } else if key == self.policy.key {
            self.policy
                .index_of(attr)
                .map(Operand::Policy)
                .ok_or_else(undeclared)
        } else {
            Err(undeclared())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::ErrorKind;

    fn shapes() -> (AttributeShape, AttributeShape, Vec<RoleDefinition>) {
        (
            AttributeShape::new("r", ["sub", "obj", "act"]),
            AttributeShape::new("p", ["sub", "obj", "act"]),
            vec![RoleDefinition::new("g")],
        )
    }

    fn parse(source: &str) -> AppResult<Matcher> {
        let (r, p, g) = shapes();
        Matcher::parse(source, &r, &p, &g)
    }

    fn rule(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_default_matcher() {
        let m = parse("g(r.sub, p.sub) && r.obj == p.obj && r.act == p.act").unwrap();
        let Expr::And(left, _) = m.expr() else {
            panic!("expected conjunction");
        };
        assert!(matches!(**left, Expr::And(..)));
    }

    #[test]
    fn test_eval_uses_role_callback() {
        let m = parse("g(r.sub, p.sub) && r.obj == p.obj && r.act == p.act").unwrap();
        let rule = rule(&["admin", "/users", "GET"]);
        let is_admin = |def: &str, s: &str, r: &str| def == "g" && s == "alice" && r == "admin";

        assert!(m.eval(&["alice", "/users", "GET"], &rule, &is_admin));
        assert!(!m.eval(&["bob", "/users", "GET"], &rule, &is_admin));
        assert!(!m.eval(&["alice", "/users", "POST"], &rule, &is_admin));
    }

    #[test]
    fn test_precedence_and_negation() {
        let m = parse("r.sub == \"root\" || !(r.act != p.act) && r.obj == p.obj").unwrap();
        let none = |_: &str, _: &str, _: &str| false;
        let rule = rule(&["x", "/a", "GET"]);

        assert!(m.eval(&["root", "/zzz", "POST"], &rule, &none));
        assert!(m.eval(&["bob", "/a", "GET"], &rule, &none));
        assert!(!m.eval(&["bob", "/a", "POST"], &rule, &none));
    }

    #[test]
    fn test_missing_value_is_false() {
        let m = parse("r.obj == p.obj").unwrap();
        let none = |_: &str, _: &str, _: &str| false;
        assert!(!m.eval(&["alice"], &rule(&["admin", "/a", "GET"]), &none));
    }

    #[test]
    fn test_rejects_undeclared_attribute() {
        let err = parse("r.sub == p.owner").unwrap_err();
        assert!(err.is(ErrorKind::Configuration));
        assert!(err.message.contains("p.owner"));
    }

    #[test]
    fn test_rejects_unknown_function() {
        let err = parse("keyMatch(r.obj, p.obj)").unwrap_err();
        assert!(err.is(ErrorKind::Configuration));
    }

    #[test]
    fn test_rejects_malformed_input() {
        for source in [
            "r.sub = p.sub",
            "r.sub == p.sub &&",
            "(r.sub == p.sub",
            "r.sub",
            "r.sub == \"open",
            "r.sub == p.sub)",
            "g(r.sub)",
        ] {
            assert!(parse(source).is_err(), "{source} should be rejected");
        }
    }
}
