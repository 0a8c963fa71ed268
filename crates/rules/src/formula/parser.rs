//! Recursive-descent parser producing the formula AST.
//!
//! Only the allow-listed grammar is accepted. Anything else, including
//! unknown function names and wrong arities, fails here rather than at
//! evaluation time.

use rust_decimal::Decimal;

use super::error::FormulaParseError;
use super::lexer::{tokenize, Token, TokenKind};

// ── AST ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(Decimal),
    Field(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

/// Allow-listed functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Min,
    Max,
    Round,
    Abs,
    Sqrt,
    Pow,
}

pub const ALLOWED_FUNCTIONS: &[&str] = &["min", "max", "round", "abs", "sqrt", "pow"];

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "min" => Some(Function::Min),
            "max" => Some(Function::Max),
            "round" => Some(Function::Round),
            "abs" => Some(Function::Abs),
            "sqrt" => Some(Function::Sqrt),
            "pow" => Some(Function::Pow),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Min => "min",
            Function::Max => "max",
            Function::Round => "round",
            Function::Abs => "abs",
            Function::Sqrt => "sqrt",
            Function::Pow => "pow",
        }
    }

    /// Inclusive (min, max) argument count; `None` means unbounded.
    fn arity(&self) -> (usize, Option<usize>) {
        match self {
            Function::Min | Function::Max => (1, None),
            Function::Round => (1, Some(2)),
            Function::Abs | Function::Sqrt => (1, Some(1)),
            Function::Pow => (2, Some(2)),
        }
    }
}

const KEYWORDS: &[&str] = &["and", "or", "not", "true", "false"];

// ── Parser ──────────────────────────────────────────────────────────

/// Parse formula source into an AST, bounding nesting at `max_depth`.
pub fn parse(source: &str, max_depth: usize) -> Result<Expr, FormulaParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
    };
    let expr = parser.expr()?;
    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(FormulaParseError::new(
            trailing.offset,
            "unexpected trailing input",
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The token stream always ends with Eof, and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(&self.peek().kind, TokenKind::Ident(name) if name == keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, FormulaParseError> {
        let token = self.advance();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(FormulaParseError::new(token.offset, format!("expected {what}")))
        }
    }

    fn enter(&mut self, offset: usize) -> Result<(), FormulaParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(FormulaParseError::new(
                offset,
                format!("expression nesting exceeds maximum depth {}", self.max_depth),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Build a binary node. Operator chains are left-deep rather than
    /// nested, so the AST height is bounded here as well as in `enter`.
    fn binary(
        &self,
        op: BinaryOp,
        left: Expr,
        right: Expr,
        offset: usize,
    ) -> Result<Expr, FormulaParseError> {
        let height = 1 + height(&left).max(height(&right));
        if height > self.max_depth {
            return Err(FormulaParseError::new(
                offset,
                format!(
                    "expression nesting exceeds maximum depth {} (`{}` chain too long)",
                    self.max_depth,
                    op.symbol()
                ),
            ));
        }
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn expr(&mut self) -> Result<Expr, FormulaParseError> {
        let offset = self.peek().offset;
        self.enter(offset)?;
        let expr = self.or();
        self.leave();
        expr
    }

    fn or(&mut self) -> Result<Expr, FormulaParseError> {
        let mut left = self.and()?;
        loop {
            let offset = self.peek().offset;
            if !(self.eat(&TokenKind::OrOr) || self.eat_keyword("or")) {
                return Ok(left);
            }
            let right = self.and()?;
            left = self.binary(BinaryOp::Or, left, right, offset)?;
        }
    }

    fn and(&mut self) -> Result<Expr, FormulaParseError> {
        let mut left = self.not()?;
        loop {
            let offset = self.peek().offset;
            if !(self.eat(&TokenKind::AndAnd) || self.eat_keyword("and")) {
                return Ok(left);
            }
            let right = self.not()?;
            left = self.binary(BinaryOp::And, left, right, offset)?;
        }
    }

    fn not(&mut self) -> Result<Expr, FormulaParseError> {
        let offset = self.peek().offset;
        if self.eat(&TokenKind::Bang) || self.eat_keyword("not") {
            self.enter(offset)?;
            let operand = self.not();
            self.leave();
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand?),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, FormulaParseError> {
        let left = self.additive()?;
        let offset = self.peek().offset;
        let op = match self.peek().kind {
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::Ne,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.additive()?;
        self.binary(op, left, right, offset)
    }

    fn additive(&mut self) -> Result<Expr, FormulaParseError> {
        let mut left = self.term()?;
        loop {
            let offset = self.peek().offset;
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.term()?;
            left = self.binary(op, left, right, offset)?;
        }
    }

    fn term(&mut self) -> Result<Expr, FormulaParseError> {
        let mut left = self.unary()?;
        loop {
            let offset = self.peek().offset;
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;
            left = self.binary(op, left, right, offset)?;
        }
    }

    fn unary(&mut self) -> Result<Expr, FormulaParseError> {
        let offset = self.peek().offset;
        if self.eat(&TokenKind::Minus) {
            self.enter(offset)?;
            let operand = self.unary();
            self.leave();
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand?),
            });
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, FormulaParseError> {
        let base = self.primary()?;
        let offset = self.peek().offset;
        if self.eat(&TokenKind::StarStar) {
            // Right associative: the exponent may itself be a power.
            self.enter(offset)?;
            let exponent = self.unary();
            self.leave();
            return self.binary(BinaryOp::Pow, base, exponent?, offset);
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, FormulaParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::LParen => {
                let inner = self.expr()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Number(Decimal::ONE)),
                "false" => Ok(Expr::Number(Decimal::ZERO)),
                _ if KEYWORDS.contains(&name.as_str()) => Err(FormulaParseError::new(
                    token.offset,
                    format!("unexpected keyword `{name}`"),
                )),
                _ if self.peek().kind == TokenKind::LParen => self.call(name, token.offset),
                _ => self.path(name),
            },
            TokenKind::Eof => Err(FormulaParseError::new(
                token.offset,
                "unexpected end of expression",
            )),
            other => Err(FormulaParseError::new(
                token.offset,
                format!("unexpected token {}", describe(&other)),
            )),
        }
    }

    fn call(&mut self, name: String, offset: usize) -> Result<Expr, FormulaParseError> {
        let function = Function::lookup(&name).ok_or_else(|| {
            FormulaParseError::new(
                offset,
                format!(
                    "unknown function `{name}` (allowed: {})",
                    ALLOWED_FUNCTIONS.join(", ")
                ),
            )
        })?;
        self.expect(TokenKind::LParen, "`(`")?;

        let mut args = Vec::new();
        if self.peek().kind != TokenKind::RParen {
            loop {
                args.push(self.expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "`)` or `,`")?;

        let (min, max) = function.arity();
        if args.len() < min || max.is_some_and(|m| args.len() > m) {
            let expected = match max {
                Some(m) if m == min => format!("{min}"),
                Some(m) => format!("{min} to {m}"),
                None => format!("at least {min}"),
            };
            return Err(FormulaParseError::new(
                offset,
                format!(
                    "`{}` takes {expected} argument(s), got {}",
                    function.name(),
                    args.len()
                ),
            ));
        }
        Ok(Expr::Call { function, args })
    }

    fn path(&mut self, first: String) -> Result<Expr, FormulaParseError> {
        let mut path = first;
        while self.eat(&TokenKind::Dot) {
            let token = self.advance();
            match token.kind {
                TokenKind::Ident(segment) => path.push_str(&format!(".{segment}")),
                TokenKind::Number(n) if n.scale() == 0 && n >= Decimal::ZERO => {
                    path.push_str(&format!(".{n}"))
                }
                _ => {
                    return Err(FormulaParseError::new(
                        token.offset,
                        "expected a field name after `.`",
                    ))
                }
            }
        }
        if self.peek().kind == TokenKind::LParen {
            return Err(FormulaParseError::new(
                self.peek().offset,
                format!("`{path}` is not a callable function"),
            ));
        }
        Ok(Expr::Field(path))
    }
}

/// Height of a parsed tree. Only called on subtrees already bounded by
/// the parser, so the recursion is shallow.
fn height(expr: &Expr) -> usize {
    match expr {
        Expr::Number(_) | Expr::Field(_) => 1,
        Expr::Unary { operand, .. } => 1 + height(operand),
        Expr::Binary { left, right, .. } => 1 + height(left).max(height(right)),
        Expr::Call { args, .. } => 1 + args.iter().map(height).max().unwrap_or(0),
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Number(n) => format!("number `{n}`"),
        TokenKind::Ident(name) => format!("`{name}`"),
        TokenKind::LParen => "`(`".into(),
        TokenKind::RParen => "`)`".into(),
        TokenKind::Comma => "`,`".into(),
        TokenKind::Dot => "`.`".into(),
        TokenKind::Plus => "`+`".into(),
        TokenKind::Minus => "`-`".into(),
        TokenKind::Star => "`*`".into(),
        TokenKind::StarStar => "`**`".into(),
        TokenKind::Slash => "`/`".into(),
        TokenKind::Percent => "`%`".into(),
        TokenKind::EqEq => "`==`".into(),
        TokenKind::NotEq => "`!=`".into(),
        TokenKind::Lt => "`<`".into(),
        TokenKind::Le => "`<=`".into(),
        TokenKind::Gt => "`>`".into(),
        TokenKind::Ge => "`>=`".into(),
        TokenKind::AndAnd => "`&&`".into(),
        TokenKind::OrOr => "`||`".into(),
        TokenKind::Bang => "`!`".into(),
        TokenKind::Eof => "end of expression".into(),
    }
}
