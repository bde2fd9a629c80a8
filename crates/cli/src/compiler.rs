//! Script compiler for the CLI.
//!
//! A recursive-descent parser producing the engine's expression AST.
//! The engine itself is parser-agnostic; this is the compiler the CLI
//! plugs into it.

use std::rc::Rc;

use datamorph_core::ast::{BinOp, Field, UnaryOp};
use datamorph_core::{Compile, Error, Expr, Result, Visibility};

pub struct Compiler;

impl Compile for Compiler {
    fn compile(&self, source: &str) -> Result<Expr> {
        let mut parser = Parser::new(source);
        let expr = parser.expression()?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(parser.error("trailing input after expression"));
        }
        Ok(expr)
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: &str) -> Error {
        let consumed: String = self.chars[..self.pos].iter().collect();
        let line = consumed.lines().count().max(1);
        let column = consumed.lines().last().map_or(1, |l| l.chars().count() + 1);
        Error::Eval {
            message: format!("Parse error: {message}"),
            position: Some(datamorph_core::Position { line, column }),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_ws(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.pos += 1;
            }
            // line comments
            if self.lookahead("//") {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.pos += 1;
                }
                continue;
            }
            break;
        }
    }

    fn lookahead(&self, token: &str) -> bool {
        self.source_at(self.pos).starts_with(token)
    }

    fn source_at(&self, pos: usize) -> String {
        self.chars[pos.min(self.chars.len())..].iter().collect()
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.lookahead(token) {
            self.pos += token.chars().count();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{token}'")))
        }
    }

    /// Keywords must not run into identifier characters.
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_ws();
        if !self.lookahead(keyword) {
            return false;
        }
        let after = self.chars.get(self.pos + keyword.chars().count());
        if after.is_some_and(|c| c.is_alphanumeric() || *c == '_') {
            return false;
        }
        self.pos += keyword.chars().count();
        true
    }

    fn ident(&mut self) -> Result<String> {
        self.skip_ws();
        let start = self.pos;
        if !self
            .peek()
            .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        {
            return Err(self.error("expected identifier"));
        }
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn expression(&mut self) -> Result<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.and_expr()?;
        while self.eat("||") {
            let rhs = self.and_expr()?;
            lhs = binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.equality()?;
        while self.eat("&&") {
            let rhs = self.equality()?;
            lhs = binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut lhs = self.comparison()?;
        loop {
            if self.eat("==") {
                lhs = binary(BinOp::Eq, lhs, self.comparison()?);
            } else if self.eat("!=") {
                lhs = binary(BinOp::Ne, lhs, self.comparison()?);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut lhs = self.additive()?;
        loop {
            if self.eat("<=") {
                lhs = binary(BinOp::Le, lhs, self.additive()?);
            } else if self.eat(">=") {
                lhs = binary(BinOp::Ge, lhs, self.additive()?);
            } else if self.eat("<") {
                lhs = binary(BinOp::Lt, lhs, self.additive()?);
            } else if self.eat(">") {
                lhs = binary(BinOp::Gt, lhs, self.additive()?);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            if self.eat("+") {
                lhs = binary(BinOp::Add, lhs, self.multiplicative()?);
            } else if self.peek_minus() {
                self.expect("-")?;
                lhs = binary(BinOp::Sub, lhs, self.multiplicative()?);
            } else {
                return Ok(lhs);
            }
        }
    }

    /// A `-` starts a subtraction only outside number literals, which
    /// are consumed whole elsewhere.
    fn peek_minus(&mut self) -> bool {
        self.skip_ws();
        self.peek() == Some('-')
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            if self.eat("*") {
                lhs = binary(BinOp::Mul, lhs, self.unary()?);
            } else if self.eat("/") {
                lhs = binary(BinOp::Div, lhs, self.unary()?);
            } else if self.eat("%") {
                lhs = binary(BinOp::Mod, lhs, self.unary()?);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        self.skip_ws();
        if self.eat("!") {
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(self.unary()?),
            });
        }
        if self.peek() == Some('-') {
            // negative number literals parse as literals
            if self
                .chars
                .get(self.pos + 1)
                .is_some_and(|c| c.is_ascii_digit())
            {
                return self.postfix();
            }
            self.pos += 1;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(self.unary()?),
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(".") {
                let name = self.ident()?;
                expr = Expr::field(expr, &name);
            } else if self.eat("(") {
                let mut args = Vec::new();
                if !self.eat(")") {
                    loop {
                        args.push(self.expression()?);
                        if self.eat(",") {
                            continue;
                        }
                        self.expect(")")?;
                        break;
                    }
                }
                expr = Expr::call(expr, args);
            } else if self.eat("[") {
                let index = self.expression()?;
                self.expect("]")?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        self.skip_ws();
        if self.eat_keyword("null") {
            return Ok(Expr::Null);
        }
        if self.eat_keyword("true") {
            return Ok(Expr::Bool(true));
        }
        if self.eat_keyword("false") {
            return Ok(Expr::Bool(false));
        }
        if self.eat_keyword("if") {
            let cond = self.expression()?;
            if !self.eat_keyword("then") {
                return Err(self.error("expected 'then'"));
            }
            let then_branch = self.expression()?;
            let else_branch = if self.eat_keyword("else") {
                Some(Box::new(self.expression()?))
            } else {
                None
            };
            return Ok(Expr::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch,
            });
        }
        if self.eat_keyword("local") {
            let mut bindings = Vec::new();
            loop {
                let name = self.ident()?;
                self.expect("=")?;
                bindings.push((name, self.expression()?));
                if self.eat(",") {
                    continue;
                }
                self.expect(";")?;
                break;
            }
            return Ok(Expr::Local {
                bindings,
                body: Box::new(self.expression()?),
            });
        }
        if self.eat_keyword("function") {
            self.expect("(")?;
            let mut params = Vec::new();
            if !self.eat(")") {
                loop {
                    params.push(self.ident()?);
                    if self.eat(",") {
                        continue;
                    }
                    self.expect(")")?;
                    break;
                }
            }
            return Ok(Expr::Func {
                params,
                body: Rc::new(self.expression()?),
            });
        }
        if self.eat("(") {
            let expr = self.expression()?;
            self.expect(")")?;
            return Ok(expr);
        }
        if self.eat("[") {
            let mut items = Vec::new();
            if !self.eat("]") {
                loop {
                    items.push(self.expression()?);
                    if self.eat(",") {
                        continue;
                    }
                    self.expect("]")?;
                    break;
                }
            }
            return Ok(Expr::Array(items));
        }
        if self.eat("{") {
            let mut fields = Vec::new();
            if !self.eat("}") {
                loop {
                    self.skip_ws();
                    let name = if self.peek() == Some('"') {
                        self.string_literal()?
                    } else {
                        self.ident()?
                    };
                    // `::` marks a hidden member
                    let visibility = if self.eat("::") {
                        Visibility::Hidden
                    } else {
                        self.expect(":")?;
                        Visibility::Normal
                    };
                    let value = self.expression()?;
                    fields.push(Field {
                        name,
                        visibility,
                        value,
                    });
                    if self.eat(",") {
                        // tolerate trailing comma
                        if self.eat("}") {
                            break;
                        }
                        continue;
                    }
                    self.expect("}")?;
                    break;
                }
            }
            return Ok(Expr::Object(fields));
        }
        self.skip_ws();
        match self.peek() {
            Some('"') => Ok(Expr::Str(self.string_literal()?)),
            Some(c) if c.is_ascii_digit() || c == '-' => self.number_literal(),
            _ => Err(self.error("expected expression")),
        }
    }

    fn string_literal(&mut self) -> Result<String> {
        self.skip_ws();
        if self.bump() != Some('"') {
            return Err(self.error("expected string literal"));
        }
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('/') => out.push('/'),
                    Some('u') => {
                        let mut code = 0u32;
                        for _ in 0..4 {
                            let digit = self
                                .bump()
                                .and_then(|c| c.to_digit(16))
                                .ok_or_else(|| self.error("invalid unicode escape"))?;
                            code = code * 16 + digit;
                        }
                        out.push(
                            char::from_u32(code)
                                .ok_or_else(|| self.error("invalid unicode escape"))?,
                        );
                    }
                    _ => return Err(self.error("invalid escape sequence")),
                },
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string literal")),
            }
        }
    }

    fn number_literal(&mut self) -> Result<Expr> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E')
        {
            let c = self.peek();
            self.pos += 1;
            // exponent signs
            if matches!(c, Some('e' | 'E')) && matches!(self.peek(), Some('+' | '-')) {
                self.pos += 1;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Expr::Num)
            .map_err(|_| self.error(&format!("invalid number literal: {text}")))
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamorph_core::{Document, Engine, MediaType};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn run(script: &str, payload_json: &str) -> String {
        let engine = Engine::new().with_compiler(Box::new(Compiler));
        let mut inputs = HashMap::new();
        inputs.insert(
            "payload".to_string(),
            Document::new(payload_json, MediaType::new("application", "json")),
        );
        engine.transform(script, &inputs, None).unwrap().content
    }

    #[test]
    fn test_literals_and_operators() {
        assert_eq!(run("1 + 2 * 3", "null"), "7");
        assert_eq!(run(r#""a" + "b""#, "null"), r#""ab""#);
        assert_eq!(run("1 < 2 && true", "null"), "true");
        assert_eq!(run("-5 + 1", "null"), "-4");
    }

    #[test]
    fn test_payload_access_and_if() {
        assert_eq!(
            run("if payload.n > 2 then \"big\" else \"small\"", r#"{"n": 5}"#),
            r#""big""#
        );
    }

    #[test]
    fn test_local_function_and_stdlib_call() {
        let script = "local double = function(x) x * 2;\nds.map(payload, double)";
        assert_eq!(run(script, "[1,2,3]"), "[2,4,6]");
    }

    #[test]
    fn test_object_with_hidden_member() {
        let script = "{ visible: 1, secret:: 2 }";
        assert_eq!(run(script, "null"), r#"{"visible":1}"#);
    }

    #[test]
    fn test_header_block_is_stripped() {
        let script = "/** DataSonnet\noutput application/json\n*/\npayload.name";
        assert_eq!(run(script, r#"{"name":"x"}"#), r#""x""#);
    }

    #[test]
    fn test_chained_calls_and_indexing() {
        let script = r#"ds.upper(payload.items[1])"#;
        assert_eq!(run(script, r#"{"items":["a","b"]}"#), r#""B""#);
    }

    #[test]
    fn test_spec_scenario_group_by() {
        let script = r#"ds.groupBy(payload, function(x) x.k)"#;
        assert_eq!(
            run(script, r#"[{"k":"a","v":1},{"k":"b","v":2},{"k":"a","v":3}]"#),
            r#"{"a":[{"k":"a","v":1},{"k":"a","v":3}],"b":[{"k":"b","v":2}]}"#
        );
    }

    #[test]
    fn test_parse_error_carries_position() {
        let compiler = Compiler;
        let err = compiler.compile("{ broken").unwrap_err();
        match err {
            datamorph_core::Error::Eval { position, .. } => assert!(position.is_some()),
            other => panic!("Expected Eval error, got {other}"),
        }
    }
}
