//! Compositional unit-expression parser.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! unit    := "-" | product
//! product := group (("*" | "." | "·" | "/") group)*      left-associative
//! group   := factor factor*                              juxtaposition
//! factor  := primary exponent?
//! primary := number | symbol | "(" product ")"
//! exponent:= ("^" | "**") int | superscripts | int directly after a symbol
//! ```
//!
//! Juxtaposed factors bind tighter than division, so `ml/min/1.73m^2` reads
//! as millilitres per minute per 1.73 square metres.
//!
//! Exponents, written or accumulated, are bounded by [`MAX_EXPONENT`].

use std::iter::Peekable;
use std::ops::Range;
use std::str::CharIndices;

use crate::dimension::Dimension;
use crate::error::{Result, UnitError};
use crate::registry::UnitRegistry;
use crate::unit::{PhysicalUnit, UnitTerm};

/// Largest absolute exponent a parsed unit may carry.
pub const MAX_EXPONENT: i32 = 32;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Symbol(Range<usize>),
    Exponent(i32),
    Mul,
    Div,
    LParen,
    RParen,
}

pub(crate) fn parse(registry: &UnitRegistry, unit: &str) -> Result<PhysicalUnit> {
    let text = unit.trim();
    if text.is_empty() {
        return Err(UnitError::parse(unit, "unit is empty"));
    }
    if text == "-" {
        return Ok(PhysicalUnit::dimensionless());
    }
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = Parser {
        registry,
        text,
        tokens,
        position: 0,
    };
    let parsed = parser.product()?;
    parsed.check_bounds(text)?;
    if parser.position < parser.tokens.len() {
        return Err(UnitError::parse(text, "unexpected trailing input"));
    }
    if !(parsed.factor.is_finite() && parsed.factor > 0.0) {
        return Err(UnitError::parse(text, "numeric factor must be positive"));
    }
    Ok(PhysicalUnit::new(
        text,
        parsed.factor,
        parsed.dimension,
        parsed.terms,
    ))
}

struct Lexer<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().peekable(),
            tokens: Vec::new(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        while let Some(&(start, c)) = self.chars.peek() {
            match c {
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '*' => {
                    self.chars.next();
                    if self.chars.next_if(|(_, c)| *c == '*').is_some() {
                        let exponent = self.signed_int(start)?;
                        self.tokens.push(Token::Exponent(exponent));
                    } else {
                        self.tokens.push(Token::Mul);
                    }
                }
                '.' | '·' => {
                    self.chars.next();
                    self.tokens.push(Token::Mul);
                }
                '/' => {
                    self.chars.next();
                    self.tokens.push(Token::Div);
                }
                '(' => {
                    self.chars.next();
                    self.tokens.push(Token::LParen);
                }
                ')' => {
                    self.chars.next();
                    self.tokens.push(Token::RParen);
                }
                '^' => {
                    self.chars.next();
                    let exponent = self.signed_int(start)?;
                    self.tokens.push(Token::Exponent(exponent));
                }
                '%' => {
                    self.chars.next();
                    self.tokens.push(Token::Symbol(start..start + 1));
                }
                c if superscript_digit(c).is_some() || c == '⁻' => {
                    let exponent = self.superscript(start)?;
                    self.tokens.push(Token::Exponent(exponent));
                }
                c if c.is_ascii_digit() => {
                    let number = self.number(start)?;
                    self.tokens.push(Token::Number(number));
                }
                c if c.is_alphabetic() => {
                    self.symbol(start)?;
                }
                other => {
                    return Err(UnitError::parse(
                        self.text,
                        format!("unexpected character `{other}` at offset {start}"),
                    ));
                }
            }
        }
        Ok(self.tokens)
    }

    fn end_offset(&mut self) -> usize {
        self.chars
            .peek()
            .map_or(self.text.len(), |(offset, _)| *offset)
    }

    fn symbol(&mut self, start: usize) -> Result<()> {
        while self.chars.next_if(|(_, c)| c.is_alphabetic()).is_some() {}
        let end = self.end_offset();
        self.tokens.push(Token::Symbol(start..end));

        // `m2`, `h-1`: an integer glued to a symbol is its exponent.
        let rest = &self.text[end..];
        let glued = rest.starts_with(|c: char| c.is_ascii_digit())
            || (rest.starts_with('-') && rest[1..].starts_with(|c: char| c.is_ascii_digit()));
        if glued {
            let exponent = self.signed_int(end)?;
            self.tokens.push(Token::Exponent(exponent));
        }
        Ok(())
    }

    fn signed_int(&mut self, start: usize) -> Result<i32> {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        let negative = match self.chars.peek() {
            Some((_, '-')) => {
                self.chars.next();
                true
            }
            Some((_, '+')) => {
                self.chars.next();
                false
            }
            _ => false,
        };
        let digits_start = self.end_offset();
        while self.chars.next_if(|(_, c)| c.is_ascii_digit()).is_some() {}
        let digits = &self.text[digits_start..self.end_offset()];
        let value: i32 = digits.parse().map_err(|_| {
            UnitError::parse(self.text, format!("expected integer exponent at offset {start}"))
        })?;
        self.bounded(if negative { -value } else { value }, start)
    }

    fn superscript(&mut self, start: usize) -> Result<i32> {
        let negative = self.chars.next_if(|(_, c)| *c == '⁻').is_some();
        let mut value: Option<i32> = None;
        while let Some((_, c)) = self.chars.next_if(|(_, c)| superscript_digit(*c).is_some()) {
            let digit = superscript_digit(c).unwrap_or_default();
            let next = value
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| self.too_large(start))?;
            value = Some(next);
        }
        let value = value.ok_or_else(|| {
            UnitError::parse(self.text, format!("dangling superscript sign at offset {start}"))
        })?;
        self.bounded(if negative { -value } else { value }, start)
    }

    fn bounded(&self, exponent: i32, start: usize) -> Result<i32> {
        if exponent.unsigned_abs() > MAX_EXPONENT.unsigned_abs() {
            return Err(self.too_large(start));
        }
        Ok(exponent)
    }

    fn too_large(&self, start: usize) -> UnitError {
        UnitError::parse(
            self.text,
            format!("exponent at offset {start} exceeds {MAX_EXPONENT}"),
        )
    }

    fn number(&mut self, start: usize) -> Result<f64> {
        while self.chars.next_if(|(_, c)| c.is_ascii_digit()).is_some() {}
        let rest = &self.text[self.end_offset()..];
        if rest.starts_with('.') && rest[1..].starts_with(|c: char| c.is_ascii_digit()) {
            self.chars.next();
            while self.chars.next_if(|(_, c)| c.is_ascii_digit()).is_some() {}
        }
        let rest = &self.text[self.end_offset()..];
        let mut exponent = rest.strip_prefix(['e', 'E']);
        if let Some(tail) = exponent {
            exponent = tail.strip_prefix(['+', '-']).or(Some(tail));
        }
        if exponent.is_some_and(|tail| tail.starts_with(|c: char| c.is_ascii_digit())) {
            self.chars.next();
            self.chars.next_if(|(_, c)| *c == '+' || *c == '-');
            while self.chars.next_if(|(_, c)| c.is_ascii_digit()).is_some() {}
        }
        let literal = &self.text[start..self.end_offset()];
        literal
            .parse()
            .map_err(|_| UnitError::parse(self.text, format!("invalid number `{literal}`")))
    }
}

fn superscript_digit(c: char) -> Option<i32> {
    match c {
        '⁰' => Some(0),
        '¹' => Some(1),
        '²' => Some(2),
        '³' => Some(3),
        '⁴' => Some(4),
        '⁵' => Some(5),
        '⁶' => Some(6),
        '⁷' => Some(7),
        '⁸' => Some(8),
        '⁹' => Some(9),
        _ => None,
    }
}

/// Partial result of evaluating a sub-expression.
struct Parsed {
    factor: f64,
    dimension: Dimension,
    terms: Vec<UnitTerm>,
}

impl Parsed {
    fn number(value: f64) -> Self {
        Self {
            factor: value,
            dimension: Dimension::DIMENSIONLESS,
            terms: Vec::new(),
        }
    }

    fn multiply(mut self, other: Parsed, text: &str) -> Result<Self> {
        self.factor *= other.factor;
        self.dimension = self
            .dimension
            .checked_multiply(&other.dimension)
            .ok_or_else(|| overflow(text))?;
        self.terms.extend(other.terms);
        self.check_bounds(text)?;
        Ok(self)
    }

    fn divide(self, other: Parsed, text: &str) -> Result<Self> {
        self.multiply(other.pow(-1, text)?, text)
    }

    fn pow(mut self, power: i32, text: &str) -> Result<Self> {
        self.factor = self.factor.powi(power);
        self.dimension = self
            .dimension
            .checked_pow(power)
            .ok_or_else(|| overflow(text))?;
        for term in &mut self.terms {
            term.exponent = term
                .exponent
                .checked_mul(power)
                .ok_or_else(|| overflow(text))?;
        }
        self.check_bounds(text)?;
        Ok(self)
    }

    fn check_bounds(&self, text: &str) -> Result<()> {
        let limit = MAX_EXPONENT.unsigned_abs();
        if self.dimension.max_abs_exponent() > limit
            || self.terms.iter().any(|t| t.exponent.unsigned_abs() > limit)
        {
            return Err(overflow(text));
        }
        Ok(())
    }
}

fn overflow(text: &str) -> UnitError {
    UnitError::parse(text, format!("combined exponent exceeds {MAX_EXPONENT}"))
}

struct Parser<'a> {
    registry: &'a UnitRegistry,
    text: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn product(&mut self) -> Result<Parsed> {
        let mut acc = self.group()?;
        loop {
            match self.peek() {
                Some(Token::Mul) => {
                    self.advance();
                    acc = acc.multiply(self.group()?, self.text)?;
                }
                Some(Token::Div) => {
                    self.advance();
                    acc = acc.divide(self.group()?, self.text)?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn group(&mut self) -> Result<Parsed> {
        let mut acc = self.factor()?;
        while matches!(
            self.peek(),
            Some(Token::Number(_) | Token::Symbol(_) | Token::LParen)
        ) {
            acc = acc.multiply(self.factor()?, self.text)?;
        }
        Ok(acc)
    }

    fn factor(&mut self) -> Result<Parsed> {
        let base = self.primary()?;
        if let Some(Token::Exponent(power)) = self.peek() {
            let power = *power;
            self.advance();
            return base.pow(power, self.text);
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Parsed> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(Parsed::number(value)),
            Some(Token::Symbol(span)) => self.symbol(span),
            Some(Token::LParen) => {
                let inner = self.product()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(UnitError::parse(self.text, "unbalanced parenthesis")),
                }
            }
            Some(token) => Err(UnitError::parse(
                self.text,
                format!("unexpected {}", describe(&token)),
            )),
            None => Err(UnitError::parse(self.text, "unexpected end of unit")),
        }
    }

    fn symbol(&self, span: Range<usize>) -> Result<Parsed> {
        let symbol = &self.text[span.clone()];
        let resolved = self
            .registry
            .resolve(symbol)
            .ok_or_else(|| UnitError::parse(self.text, format!("unknown unit `{symbol}`")))?;
        Ok(Parsed {
            factor: resolved.factor(),
            dimension: resolved.atom.dimension,
            terms: vec![UnitTerm {
                prefix: resolved.prefix.map(|p| p.symbol.clone()),
                atom: resolved.atom.symbol.clone(),
                exponent: 1,
                span: span.start + resolved.prefix_len..span.end,
            }],
        })
    }
}

fn describe(token: &Token) -> &'static str {
    match token {
        Token::Number(_) => "number",
        Token::Symbol(_) => "symbol",
        Token::Exponent(_) => "exponent",
        Token::Mul => "`*`",
        Token::Div => "`/`",
        Token::LParen => "`(`",
        Token::RParen => "`)`",
    }
}
