//! Formula parser
//!
//! A recursive descent parser with proper operator precedence, running over the
//! significant tokens produced by [`crate::tokenizer`].

use crate::ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::tokenizer::{normalize_tokens, Token, TokenKind};
use gridref_core::cell::unquote_sheet_name;
use gridref_core::{parse_address, Coord, ErrorKind};

/// Deepest nesting of parentheses, calls and prefix operators a formula may use
pub const MAX_NESTING: usize = 100;

/// Parse a formula string into an AST
///
/// The leading `=` is optional.
///
/// # Example
/// ```rust
/// use gridref_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=SUM(A1:A10)").unwrap();
/// let ast = parse_formula("IF(A1>0,\"Yes\",\"No\")").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let tokens = normalize_tokens(formula);
    if tokens.is_empty() {
        return Err(FormulaError::Parse("Empty formula".into()));
    }

    let mut parser = FormulaParser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if let Some(token) = parser.current_token() {
        return Err(FormulaError::Parse(format!(
            "Unexpected '{}' at offset {}",
            token.image, token.start
        )));
    }

    Ok(expr)
}

/// Formula parser
struct FormulaParser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl FormulaParser {
    // === Helper methods ===

    fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.current_token().map(|t| t.kind)
    }

    fn current_operator(&self) -> Option<&str> {
        self.current_token()
            .filter(|t| t.kind == TokenKind::Operator)
            .map(|t| t.image.as_str())
    }

    fn consume(&mut self) -> FormulaResult<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| FormulaError::Parse("Unexpected end of formula".into()))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: TokenKind) -> FormulaResult<()> {
        match self.current_token() {
            Some(token) if token.kind == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(token) => Err(FormulaError::Parse(format!(
                "Expected {:?}, got '{}' at offset {}",
                expected, token.image, token.start
            ))),
            None => Err(FormulaError::Parse(format!(
                "Expected {:?}, got end of formula",
                expected
            ))),
        }
    }

    /// Run `parse` one nesting level deeper
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> FormulaResult<T>,
    ) -> FormulaResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(FormulaError::Parse(format!(
                "Formula nested deeper than {} levels",
                MAX_NESTING
            )));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Concatenation: &
    // 3. Addition/Subtraction: +, -
    // 4. Multiplication/Division: *, /
    // 5. Exponentiation: ^
    // 6. Unary: -, %
    // 7. Primary: literals, references, function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.nested(Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_concatenation()?;

        loop {
            let op = match self.current_operator() {
                Some("=") => BinaryOperator::Equal,
                Some("<>") => BinaryOperator::NotEqual,
                Some("<") => BinaryOperator::LessThan,
                Some("<=") => BinaryOperator::LessEqual,
                Some(">") => BinaryOperator::GreaterThan,
                Some(">=") => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.pos += 1;
            let right = self.parse_concatenation()?;
            left = FormulaExpr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_concatenation(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_additive()?;

        while self.current_operator() == Some("&") {
            self.pos += 1;
            let right = self.parse_additive()?;
            left = FormulaExpr::BinaryOp {
                op: BinaryOperator::Concat,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_operator() {
                Some("+") => BinaryOperator::Add,
                Some("-") => BinaryOperator::Subtract,
                _ => break,
            };

            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = FormulaExpr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_exponent()?;

        loop {
            let op = match self.current_operator() {
                Some("*") => BinaryOperator::Multiply,
                Some("/") => BinaryOperator::Divide,
                _ => break,
            };

            self.pos += 1;
            let right = self.parse_exponent()?;
            left = FormulaExpr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_exponent(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_unary()?;

        if self.current_operator() == Some("^") {
            self.pos += 1;
            let right = self.nested(Self::parse_exponent)?; // Right associative
            return Ok(FormulaExpr::BinaryOp {
                op: BinaryOperator::Power,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.current_operator() {
            Some("-") => {
                self.pos += 1;
                let operand = self.nested(Self::parse_unary)?;
                return Ok(FormulaExpr::UnaryOp {
                    op: UnaryOperator::Negate,
                    operand: Box::new(operand),
                });
            }
            // Prefix plus (no-op)
            Some("+") => {
                self.pos += 1;
                return self.nested(Self::parse_unary);
            }
            _ => {}
        }

        let mut expr = self.parse_primary()?;

        while self.current_operator() == Some("%") {
            self.pos += 1;
            expr = FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        let token = self.consume()?;

        match token.kind {
            TokenKind::Number => token
                .image
                .parse()
                .map(FormulaExpr::Number)
                .map_err(|_| FormulaError::Parse(format!("Invalid number '{}'", token.image))),

            TokenKind::StringLit => parse_string_literal(&token).map(FormulaExpr::Text),

            TokenKind::Boolean => Ok(FormulaExpr::Boolean(
                token.image.eq_ignore_ascii_case("TRUE"),
            )),

            TokenKind::ErrorLiteral => ErrorKind::from_code(&token.image)
                .map(FormulaExpr::Error)
                .ok_or_else(|| FormulaError::Parse(format!("Unknown error '{}'", token.image))),

            TokenKind::OpenParen => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(expr)
            }

            TokenKind::SheetPrefix => {
                let name = token.image.strip_suffix('!').unwrap_or(&token.image);
                let sheet = unquote_sheet_name(name);
                let next = self.consume()?;
                match next.kind {
                    TokenKind::CellRef => parse_cell_reference(Some(sheet), &next),
                    TokenKind::RangeRef => parse_range_reference(Some(sheet), &next),
                    _ => Err(FormulaError::Parse(format!(
                        "Expected cell reference after '{}'",
                        token.image
                    ))),
                }
            }

            TokenKind::CellRef => parse_cell_reference(None, &token),

            TokenKind::RangeRef => parse_range_reference(None, &token),

            TokenKind::FunctionName => {
                let name = token.function_name().unwrap_or(&token.image);
                self.parse_function_call(name.to_uppercase())
            }

            TokenKind::Name => Ok(FormulaExpr::NameRef(token.image)),

            _ => Err(FormulaError::Parse(format!(
                "Unexpected '{}' at offset {}",
                token.image, token.start
            ))),
        }
    }

    /// Arguments after the `NAME(` token
    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        let mut args = Vec::new();

        if self.current_kind() != Some(TokenKind::CloseParen) {
            args.push(self.parse_expression()?);

            while self.current_kind() == Some(TokenKind::Comma) {
                self.pos += 1;
                args.push(self.parse_expression()?);
            }
        }

        self.expect(TokenKind::CloseParen)?;

        Ok(FormulaExpr::Function { name, args })
    }
}

fn parse_string_literal(token: &Token) -> FormulaResult<String> {
    let inner = token
        .image
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .filter(|_| token.image.len() >= 2)
        .ok_or_else(|| FormulaError::Parse(format!("Unterminated string at offset {}", token.start)))?;
    Ok(inner.replace("\"\"", "\""))
}

fn parse_coord(text: &str) -> FormulaResult<Coord> {
    parse_address(text)
        .ok_or_else(|| FormulaError::Parse(format!("Invalid cell reference '{}'", text)))
}

fn parse_cell_reference(sheet: Option<String>, token: &Token) -> FormulaResult<FormulaExpr> {
    Ok(FormulaExpr::CellRef(CellReference {
        sheet,
        coord: parse_coord(&token.image)?,
    }))
}

fn parse_range_reference(sheet: Option<String>, token: &Token) -> FormulaResult<FormulaExpr> {
    let (left, right) = token
        .image
        .split_once(':')
        .ok_or_else(|| FormulaError::Parse(format!("Invalid range '{}'", token.image)))?;

    let (right_sheet, right) = match right.rfind('!') {
        Some(pos) => (Some(unquote_sheet_name(&right[..pos])), &right[pos + 1..]),
        None => (None, right),
    };

    // Make sure sheets match
    if right_sheet.is_some() && right_sheet != sheet {
        return Err(FormulaError::Parse(
            "Range references must be on the same sheet".into(),
        ));
    }

    let a = parse_coord(left)?;
    let b = parse_coord(right)?;
    Ok(FormulaExpr::RangeRef(RangeReference {
        sheet,
        start: Coord::new(a.row.min(b.row), a.col.min(b.col)),
        end: Coord::new(a.row.max(b.row), a.col.max(b.col)),
    }))
}
