// src/expression.rs
use std::fmt;

use crate::errors::SyntaxError;
use crate::parser::Parser;

const MAX_DEPTH: usize = 128;

/// A parsed `${{ ... }}` span.
#[derive(Debug, Clone)]
pub struct Expression {
    pub source: String,
    pub root: OrExpr,
}

#[derive(Debug, Clone)]
pub struct OrExpr {
    pub operands: Vec<AndExpr>,
}

#[derive(Debug, Clone)]
pub struct AndExpr {
    pub operands: Vec<ComparisonExpr>,
}

/// `first (op operand)*`; anything but zero or one trailing pair is rejected
/// at evaluation time.
#[derive(Debug, Clone)]
pub struct ComparisonExpr {
    pub first: EqualityExpr,
    pub rest: Vec<(ComparisonOp, EqualityExpr)>,
}

#[derive(Debug, Clone)]
pub struct EqualityExpr {
    pub first: Primary,
    pub rest: Vec<(EqualityOp, Primary)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualityOp {
    Eq,
    Ne,
}

#[derive(Debug, Clone)]
pub enum Primary {
    Variable(Variable),
    FunctionCall(FunctionCall),
    /// Raw number text.
    Number(String),
    /// Raw string token, quotes included.
    String(String),
    Boolean(bool),
    Null,
    /// Parenthesized sub-expression.
    Term(Box<OrExpr>),
    Not(Box<Primary>),
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub root: String,
    pub path: Vec<PathSegment>,
}

#[derive(Debug, Clone)]
pub enum PathSegment {
    Key(String),
    Index(Box<Primary>),
    /// `[*]` or `.*`
    Filter,
}

#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Argument>,
}

#[derive(Debug, Clone)]
pub enum Argument {
    Variable(Variable),
    String(String),
    Number(String),
    Boolean(bool),
    Null,
}

/// Parse one span, delimiters included. On failure no tree is produced.
pub fn parse_expr(input: &str) -> Result<Expression, Vec<SyntaxError>> {
    let mut p = EParser::new(input);
    let root = p.parse_span().map_err(|e| vec![e])?;
    Ok(Expression { source: input.to_string(), root })
}

struct EParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> EParser<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            parser: Parser::new(s),
            depth: 0,
        }
    }

    fn parse_span(&mut self) -> Result<OrExpr, SyntaxError> {
        self.parser.skip_ws();
        self.parser.expect_str("${{")?;
        let root = self.parse_or()?;
        self.parser.skip_ws();
        self.parser.expect_str("}}")?;
        self.parser.skip_ws();
        if !self.parser.eof() {
            return Err(self.parser.error("trailing input after '}}'"));
        }
        Ok(root)
    }

    fn parse_or(&mut self) -> Result<OrExpr, SyntaxError> {
        let mut operands = vec![self.parse_and()?];
        loop {
            self.parser.skip_ws();
            if !self.parser.consume_str("||") {
                break;
            }
            operands.push(self.parse_and()?);
        }
        Ok(OrExpr { operands })
    }

    fn parse_and(&mut self) -> Result<AndExpr, SyntaxError> {
        let mut operands = vec![self.parse_comparison()?];
        loop {
            self.parser.skip_ws();
            if !self.parser.consume_str("&&") {
                break;
            }
            operands.push(self.parse_comparison()?);
        }
        Ok(AndExpr { operands })
    }

    fn parse_comparison(&mut self) -> Result<ComparisonExpr, SyntaxError> {
        let first = self.parse_equality()?;
        let mut rest = Vec::new();
        loop {
            self.parser.skip_ws();
            let op = if self.parser.consume_str("<=") {
                ComparisonOp::Le
            } else if self.parser.consume_str(">=") {
                ComparisonOp::Ge
            } else if self.parser.consume_char('<') {
                ComparisonOp::Lt
            } else if self.parser.consume_char('>') {
                ComparisonOp::Gt
            } else {
                break;
            };
            rest.push((op, self.parse_equality()?));
        }
        Ok(ComparisonExpr { first, rest })
    }

    fn parse_equality(&mut self) -> Result<EqualityExpr, SyntaxError> {
        let first = self.parse_primary()?;
        let mut rest = Vec::new();
        loop {
            self.parser.skip_ws();
            let op = if self.parser.consume_str("==") {
                EqualityOp::Eq
            } else if self.parser.consume_str("!=") {
                EqualityOp::Ne
            } else {
                break;
            };
            rest.push((op, self.parse_primary()?));
        }
        Ok(EqualityExpr { first, rest })
    }

    fn parse_primary(&mut self) -> Result<Primary, SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.parser.error("expression nested too deeply"));
        }
        let node = self.parse_primary_inner();
        self.depth -= 1;
        node
    }

    fn parse_primary_inner(&mut self) -> Result<Primary, SyntaxError> {
        self.parser.skip_ws();
        if self.parser.consume_char('!') {
            let inner = self.parse_primary()?;
            return Ok(Primary::Not(Box::new(inner)));
        }
        if self.parser.consume_char('(') {
            let inner = self.parse_or()?;
            self.parser.skip_ws();
            self.parser.expect(')')?;
            return Ok(Primary::Term(Box::new(inner)));
        }
        if let Some(literal) = self.parse_literal()? {
            return Ok(match literal {
                Argument::String(s) => Primary::String(s),
                Argument::Number(n) => Primary::Number(n),
                Argument::Boolean(b) => Primary::Boolean(b),
                Argument::Null => Primary::Null,
                Argument::Variable(v) => Primary::Variable(v),
            });
        }
        let name = self.parse_root_identifier()?;
        self.parser.skip_ws();
        if self.parser.consume_char('(') {
            let args = self.parse_args()?;
            self.parser.expect(')')?;
            return Ok(Primary::FunctionCall(FunctionCall { name: name.to_string(), args }));
        }
        Ok(Primary::Variable(self.parse_variable_path(name)?))
    }

    /// String, number, boolean or null literal, if one starts here.
    fn parse_literal(&mut self) -> Result<Option<Argument>, SyntaxError> {
        let p = &mut self.parser;
        let starts_number = match p.peek_char() {
            Some('-') => p.peek_second_char().map_or(false, |c| c.is_ascii_digit()),
            Some(c) => c.is_ascii_digit(),
            None => false,
        };
        if starts_number {
            return Ok(Some(Argument::Number(p.parse_number_literal()?.to_string())));
        }
        if p.peek_char() == Some('\'') {
            return Ok(Some(Argument::String(p.parse_quoted_string()?.to_string())));
        }
        for (word, literal) in [
            ("true", Argument::Boolean(true)),
            ("false", Argument::Boolean(false)),
            ("null", Argument::Null),
        ] {
            if p.peek_keyword(word) {
                p.consume_str(word);
                return Ok(Some(literal));
            }
        }
        Ok(None)
    }

    fn parse_root_identifier(&mut self) -> Result<&'a str, SyntaxError> {
        match self.parser.peek_char() {
            Some(c) if c == '_' || c.is_ascii_alphabetic() => self.parser.parse_identifier(),
            _ => Err(self.parser.unexpected("an expression")),
        }
    }

    fn parse_variable_path(&mut self, root: &str) -> Result<Variable, SyntaxError> {
        let mut path = Vec::new();
        loop {
            self.parser.skip_ws();
            if self.parser.consume_char('.') {
                self.parser.skip_ws();
                if self.parser.consume_char('*') {
                    path.push(PathSegment::Filter);
                } else {
                    let key = self.parser.parse_identifier()?;
                    path.push(PathSegment::Key(key.to_string()));
                }
            } else if self.parser.consume_char('[') {
                self.parser.skip_ws();
                if self.parser.consume_char('*') {
                    path.push(PathSegment::Filter);
                } else {
                    let index = self.parse_primary()?;
                    path.push(PathSegment::Index(Box::new(index)));
                }
                self.parser.skip_ws();
                self.parser.expect(']')?;
            } else {
                break;
            }
        }
        Ok(Variable { root: root.to_string(), path })
    }

    fn parse_args(&mut self) -> Result<Vec<Argument>, SyntaxError> {
        let mut out = Vec::new();
        self.parser.skip_ws();
        if self.parser.peek_char() == Some(')') {
            return Ok(out);
        }
        loop {
            out.push(self.parse_argument()?);
            self.parser.skip_ws();
            if self.parser.consume_char(',') {
                continue;
            }
            break;
        }
        Ok(out)
    }

    fn parse_argument(&mut self) -> Result<Argument, SyntaxError> {
        self.parser.skip_ws();
        if let Some(literal) = self.parse_literal()? {
            return Ok(literal);
        }
        let start = self.parser.column();
        let name = match self.parser.peek_char() {
            Some(c) if c == '_' || c.is_ascii_alphabetic() => self.parser.parse_identifier()?,
            _ => return Err(self.parser.unexpected("a function argument")),
        };
        self.parser.skip_ws();
        if self.parser.peek_char() == Some('(') {
            return Err(SyntaxError::new(
                start,
                format!("function call {name}() is not allowed as an argument"),
            ));
        }
        Ok(Argument::Variable(self.parse_variable_path(name)?))
    }
}

impl fmt::Display for OrExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.operands.iter().enumerate() {
            if i > 0 {
                f.write_str(" || ")?;
            }
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

impl fmt::Display for AndExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.operands.iter().enumerate() {
            if i > 0 {
                f.write_str(" && ")?;
            }
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ComparisonExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first)?;
        for (op, rhs) in &self.rest {
            write!(f, " {op} {rhs}")?;
        }
        Ok(())
    }
}

impl fmt::Display for EqualityExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first)?;
        for (op, rhs) in &self.rest {
            write!(f, " {op} {rhs}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComparisonOp::Lt => "<",
            ComparisonOp::Gt => ">",
            ComparisonOp::Le => "<=",
            ComparisonOp::Ge => ">=",
        })
    }
}

impl fmt::Display for EqualityOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EqualityOp::Eq => "==",
            EqualityOp::Ne => "!=",
        })
    }
}

impl fmt::Display for Primary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primary::Variable(v) => write!(f, "{v}"),
            Primary::FunctionCall(call) => write!(f, "{call}"),
            Primary::Number(n) | Primary::String(n) => f.write_str(n),
            Primary::Boolean(b) => write!(f, "{b}"),
            Primary::Null => f.write_str("null"),
            Primary::Term(inner) => write!(f, "({inner})"),
            Primary::Not(inner) => write!(f, "!{inner}"),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for seg in &self.path {
            match seg {
                PathSegment::Key(k) => write!(f, ".{k}")?,
                PathSegment::Index(i) => write!(f, "[{i}]")?,
                PathSegment::Filter => f.write_str("[*]")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Variable(v) => write!(f, "{v}"),
            Argument::String(s) | Argument::Number(s) => f.write_str(s),
            Argument::Boolean(b) => write!(f, "{b}"),
            Argument::Null => f.write_str("null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_ok(input: &str) -> Expression {
        match parse_expr(input) {
            Ok(e) => e,
            Err(errs) => panic!("{input}: {errs:?}"),
        }
    }

    #[test]
    fn precedence_layers() {
        let e = parse_ok("${{ a.x == 'x' && b.y == 'y' || c.z > 1 }}");
        assert_eq!(e.root.operands.len(), 2);
        assert_eq!(e.root.operands[0].operands.len(), 2);
        assert_eq!(e.root.to_string(), "a.x == 'x' && b.y == 'y' || c.z > 1");
    }

    #[test]
    fn parenthesized_terms() {
        let e = parse_ok("${{ (a.x == 'x' || a.x == 'y') && !(b.ok) }}");
        let and = &e.root.operands[0];
        assert_eq!(and.operands.len(), 2);
        assert!(matches!(and.operands[0].first.first, Primary::Term(_)));
        assert!(matches!(and.operands[1].first.first, Primary::Not(_)));
    }

    #[test]
    fn variable_paths() {
        let e = parse_ok("${{ git.changes[0].hash }}");
        match &e.root.operands[0].operands[0].first.first {
            Primary::Variable(v) => {
                assert_eq!(v.root, "git");
                assert_eq!(v.path.len(), 3);
                assert!(matches!(v.path[1], PathSegment::Index(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
        let e = parse_ok("${{ git.changes.*.message }}");
        assert_eq!(e.root.to_string(), "git.changes[*].message");
    }

    #[test]
    fn function_calls_and_literals() {
        let e = parse_ok("${{ format('{0}-{1}', git.branch, 2, true, null) }}");
        match &e.root.operands[0].operands[0].first.first {
            Primary::FunctionCall(call) => {
                assert_eq!(call.name, "format");
                assert_eq!(call.args.len(), 5);
                assert!(matches!(call.args[3], Argument::Boolean(true)));
            }
            other => panic!("unexpected {other:?}"),
        }
        parse_ok("${{ always() }}");
        parse_ok("${{ false && spy() }}");
        parse_ok("${{ job.num >= -1.5e2 }}");
    }

    #[test]
    fn rejects_malformed_spans() {
        for bad in [
            "${{ ${{git.branch }}",
            "${{ contains(git.message, 'foobar' }}",
            "${{ }}",
            "${{ a.b == }}",
            "${{ 'open }}",
            "${{ a.b }} tail",
            "${{ f(g(x)) }}",
            "${{ f((a)) }}",
            "${{ a[1 }}",
            "${{ a | b }}",
        ] {
            assert!(parse_expr(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn diagnostics_point_at_offending_column() {
        let errs = parse_expr("${{ a.b == }}").unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].column, 11);
    }

    #[test]
    fn deep_nesting_is_a_diagnostic() {
        let src = format!("${{{{ {}a.b{} }}}}", "(".repeat(300), ")".repeat(300));
        assert!(parse_expr(&src).is_err());
    }
}
