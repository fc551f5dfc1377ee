//! Expression tokenizer and recursive-descent parser.
//!
//! Grammar (LL(1)):
//!
//! ```text
//! expression := ['+' | '-'] term { ('+' | '-') term }
//! term       := factor { ('*' | '/') factor }
//! factor     := atom [ '^' factor ]
//! atom       := number | identifier ['(' args ')'] | '(' expression ')'
//! args       := expression { ',' expression }
//! ```
//!
//! Numbers cover integers and floats with an optional decimal exponent; a
//! float `m.f E x` lowers to `Integer(mf) * IntegerPower(Integer(10),
//! x - len(f))`. Identifiers are case-insensitive, and the glyph `√` is a
//! synonym for `sqrt`.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::error::ParseError;
use crate::real::Real;
use crate::settings::ConstFactory;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Tok {
    Number { mantissa: BigInt, exp10: i64 },
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Number { .. } => "number".to_string(),
            Tok::Ident(name) => format!("{name:?}"),
            Tok::Plus => "'+'".to_string(),
            Tok::Minus => "'-'".to_string(),
            Tok::Star => "'*'".to_string(),
            Tok::Slash => "'/'".to_string(),
            Tok::Caret => "'^'".to_string(),
            Tok::LParen => "'('".to_string(),
            Tok::RParen => "')'".to_string(),
            Tok::Comma => "','".to_string(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Tok>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        match c {
            '+' => {
                out.push(Tok::Plus);
                i += 1;
                continue;
            }
            '-' => {
                out.push(Tok::Minus);
                i += 1;
                continue;
            }
            '*' => {
                out.push(Tok::Star);
                i += 1;
                continue;
            }
            '/' => {
                out.push(Tok::Slash);
                i += 1;
                continue;
            }
            '^' => {
                out.push(Tok::Caret);
                i += 1;
                continue;
            }
            '(' => {
                out.push(Tok::LParen);
                i += 1;
                continue;
            }
            ')' => {
                out.push(Tok::RParen);
                i += 1;
                continue;
            }
            ',' => {
                out.push(Tok::Comma);
                i += 1;
                continue;
            }
            '√' => {
                out.push(Tok::Ident("sqrt".to_string()));
                i += 1;
                continue;
            }
            _ => {}
        }

        if c.is_ascii_digit() {
            let (token, next) = lex_number(&chars, i)?;
            out.push(token);
            i = next;
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            out.push(Tok::Ident(word.to_lowercase()));
            continue;
        }

        return Err(ParseError::UnexpectedChar { ch: c, pos: i });
    }

    Ok(out)
}

/// Lexes `digit+ ['.' digit*] [('e'|'E') ['+'|'-'] digit+]` starting at
/// `start`. The trailing exponent is only consumed when digits follow, so
/// an `e` that is really the constant stays untouched.
fn lex_number(chars: &[char], start: usize) -> Result<(Tok, usize), ParseError> {
    let mut i = start;
    let mut digits = String::new();
    while i < chars.len() && chars[i].is_ascii_digit() {
        digits.push(chars[i]);
        i += 1;
    }

    let mut frac_len = 0i64;
    if i < chars.len() && chars[i] == '.' {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            digits.push(chars[i]);
            frac_len += 1;
            i += 1;
        }
    }

    let mut exponent = 0i64;
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        let mut negative = false;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            negative = chars[j] == '-';
            j += 1;
        }
        let exp_start = j;
        let mut exp_digits = String::new();
        while j < chars.len() && chars[j].is_ascii_digit() {
            exp_digits.push(chars[j]);
            j += 1;
        }
        if j > exp_start {
            let magnitude: i64 = exp_digits
                .parse()
                .map_err(|_| ParseError::ExponentOverflow)?;
            exponent = if negative { -magnitude } else { magnitude };
            i = j;
        }
    }

    let mantissa: BigInt = digits
        .parse()
        .map_err(|_| ParseError::UnexpectedChar { ch: '.', pos: start })?;
    let exp10 = exponent
        .checked_sub(frac_len)
        .ok_or(ParseError::ExponentOverflow)?;
    Ok((Tok::Number { mantissa, exp10 }, i))
}

/// A parsed factor, remembering the exact integer literal when there is
/// one so `^` can lower to `IntegerPower` instead of `exp(y ln x)`.
struct Factor {
    value: Real,
    integer_literal: Option<BigInt>,
}

impl Factor {
    fn plain(value: Real) -> Self {
        Self {
            value,
            integer_literal: None,
        }
    }
}

struct Parser<'a> {
    tokens: Vec<Tok>,
    pos: usize,
    factory: &'a ConstFactory,
}

/// Parses an expression into an evaluation graph. Constants come from the
/// supplied factory so every expression shares the same pi and e nodes.
pub fn parse_expression(input: &str, factory: &ConstFactory) -> Result<Real, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        factory,
    };
    let value = parser.expression()?;
    match parser.peek() {
        None => Ok(value),
        Some(tok) => Err(ParseError::UnexpectedToken {
            found: tok.describe(),
            pos: parser.pos,
        }),
    }
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Tok) -> Result<(), ParseError> {
        match self.advance() {
            Some(tok) if &tok == expected => Ok(()),
            Some(tok) => Err(ParseError::UnexpectedToken {
                found: tok.describe(),
                pos: self.pos - 1,
            }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn expression(&mut self) -> Result<Real, ParseError> {
        let negate_first = match self.peek() {
            Some(Tok::Plus) => {
                self.advance();
                false
            }
            Some(Tok::Minus) => {
                self.advance();
                true
            }
            _ => false,
        };
        let mut value = self.term()?;
        if negate_first {
            value = -value;
        }
        loop {
            match self.peek() {
                Some(Tok::Plus) => {
                    self.advance();
                    value = value + self.term()?;
                }
                Some(Tok::Minus) => {
                    self.advance();
                    value = value - self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<Real, ParseError> {
        let mut value = self.factor()?.value;
        loop {
            match self.peek() {
                Some(Tok::Star) => {
                    self.advance();
                    value = value * self.factor()?.value;
                }
                Some(Tok::Slash) => {
                    self.advance();
                    value = value / self.factor()?.value;
                }
                _ => return Ok(value),
            }
        }
    }

    fn factor(&mut self) -> Result<Factor, ParseError> {
        let base = self.atom()?;
        if self.peek() != Some(&Tok::Caret) {
            return Ok(base);
        }
        self.advance();
        let exponent = self.factor()?;
        let value = match exponent.integer_literal {
            Some(literal) => {
                let exponent = literal.to_i64().ok_or(ParseError::ExponentOverflow)?;
                base.value.pow_int(exponent)
            }
            None => base.value.pow(exponent.value),
        };
        Ok(Factor::plain(value))
    }

    fn atom(&mut self) -> Result<Factor, ParseError> {
        match self.advance() {
            Some(Tok::Number { mantissa, exp10 }) => Ok(lower_number(mantissa, exp10)),
            Some(Tok::Ident(name)) => self.identifier(name),
            Some(Tok::LParen) => {
                let value = self.expression()?;
                self.expect(&Tok::RParen)?;
                Ok(Factor::plain(value))
            }
            Some(tok) => Err(ParseError::UnexpectedToken {
                found: tok.describe(),
                pos: self.pos - 1,
            }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn identifier(&mut self, name: String) -> Result<Factor, ParseError> {
        match name.as_str() {
            "pi" => return Ok(Factor::plain(self.factory.pi())),
            "e" => return Ok(Factor::plain(self.factory.e())),
            _ => {}
        }

        let expected_arity = match name.as_str() {
            "abs" | "sqrt" | "exp" | "ln" | "sin" | "cos" | "tan" | "asin" | "acos" | "atan" => 1,
            "pow" => 2,
            _ => return Err(ParseError::UnknownIdentifier(name)),
        };

        if self.peek() != Some(&Tok::LParen) {
            return Err(ParseError::WrongArity {
                name,
                expected: expected_arity,
                found: 0,
            });
        }
        self.advance();
        let mut args = vec![self.expression()?];
        while self.peek() == Some(&Tok::Comma) {
            self.advance();
            args.push(self.expression()?);
        }
        self.expect(&Tok::RParen)?;
        if args.len() != expected_arity {
            return Err(ParseError::WrongArity {
                name,
                expected: expected_arity,
                found: args.len(),
            });
        }

        let mut args = args.into_iter();
        let first = args.next().ok_or(ParseError::UnexpectedEnd)?;
        let value = match name.as_str() {
            "abs" => first.abs(),
            "sqrt" => first.sqrt(),
            "exp" => first.exp(),
            "ln" => first.ln(),
            "sin" => first.sin(),
            "cos" => first.cos(),
            "tan" => first.tan(),
            "asin" => first.asin(),
            "acos" => first.acos(),
            "atan" => first.atan(),
            "pow" => {
                let exponent = args.next().ok_or(ParseError::UnexpectedEnd)?;
                first.pow(exponent)
            }
            _ => return Err(ParseError::UnknownIdentifier(name)),
        };
        Ok(Factor::plain(value))
    }
}

/// Lowers `mantissa * 10^exp10` into the graph. A pure integer keeps its
/// literal so `^` can use `IntegerPower`.
fn lower_number(mantissa: BigInt, exp10: i64) -> Factor {
    if exp10 == 0 {
        return Factor {
            value: Real::integer(mantissa.clone()),
            integer_literal: Some(mantissa),
        };
    }
    let scale = Real::from_i64(10).pow_int(exp10);
    Factor::plain(Real::integer(mantissa) * scale)
}
