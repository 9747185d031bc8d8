//! Strict parser for dictionary literals such as `{'car': 2, "bus": 1}`.
//!
//! Older uploaders stored the `count` field as the textual form of a
//! dictionary instead of a native document. This module decodes that text
//! into a [`serde_json::Value`] without evaluating anything: only quoted
//! strings, numbers, `True`/`False`/`None`, dicts, lists and tuples are
//! accepted.

use anyhow::{Result, anyhow, bail};
use serde_json::{Map, Number, Value};

/// Nesting limit for dicts/lists/tuples.
const MAX_DEPTH: usize = 64;

/// Parses one literal, rejecting trailing input.
///
/// # Errors
///
/// Returns an error describing the byte offset and the unexpected input
/// when `text` is not a well-formed literal.
pub fn parse_literal(text: &str) -> Result<Value> {
    let mut parser = LiteralParser::new(text);
    let value = parser.value(0)?;
    parser.skip_ws();
    if let Some(c) = parser.peek() {
        bail!("unexpected trailing {:?} at offset {}", c, parser.pos);
    }
    Ok(value)
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, want: char) -> Result<()> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => bail!(
                "expected {:?} but found {:?} at offset {}",
                want,
                c,
                self.pos - c.len_utf8()
            ),
            None => bail!("expected {:?} but input ended", want),
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            bail!("literal nested deeper than {}", MAX_DEPTH);
        }
        self.skip_ws();
        match self.peek() {
            Some('{') => self.dict(depth),
            Some('[') => self.sequence('[', ']', depth),
            Some('(') => self.sequence('(', ')', depth),
            Some('\'') | Some('"') => self.strings(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.keyword(),
            Some(c) => bail!("unexpected {:?} at offset {}", c, self.pos),
            None => bail!("unexpected end of input"),
        }
    }

    fn dict(&mut self, depth: usize) -> Result<Value> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Value::Object(map));
            }
            let key = self.value(depth + 1)?;
            let key = dict_key(key)?;
            self.expect(':')?;
            let value = self.value(depth + 1)?;
            // Later duplicates win, as they would in a dict display.
            map.insert(key, value);

            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                Some(c) => bail!(
                    "expected ',' or '}}' but found {:?} at offset {}",
                    c,
                    self.pos - c.len_utf8()
                ),
                None => bail!("unterminated dict"),
            }
        }
    }

    fn sequence(&mut self, open: char, close: char, depth: usize) -> Result<Value> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(Value::Array(items));
            }
            items.push(self.value(depth + 1)?);

            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(Value::Array(items)),
                Some(c) => bail!(
                    "expected ',' or {:?} but found {:?} at offset {}",
                    close,
                    c,
                    self.pos - c.len_utf8()
                ),
                None => bail!("unterminated sequence"),
            }
        }
    }

    /// Adjacent string literals concatenate: `'ca' 'r'` is `"car"`.
    fn strings(&mut self) -> Result<Value> {
        let mut out = self.string()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('\'') | Some('"') => out.push_str(&self.string()?),
                _ => return Ok(Value::String(out)),
            }
        }
    }

    fn string(&mut self) -> Result<String> {
        let start = self.pos;
        let quote = match self.bump() {
            Some(q @ ('\'' | '"')) => q,
            _ => bail!("expected a quote at offset {}", start),
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => bail!("unterminated string starting at offset {}", start),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> Result<char> {
        let c = self.bump().ok_or_else(|| anyhow!("dangling escape at end of input"))?;
        Ok(match c {
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            'x' => self.hex_escape(2)?,
            'u' => self.hex_escape(4)?,
            other => bail!("unsupported escape \\{} at offset {}", other, self.pos - 1),
        })
    }

    fn hex_escape(&mut self, len: usize) -> Result<char> {
        let digits = self
            .rest()
            .get(..len)
            .ok_or_else(|| anyhow!("truncated hex escape at offset {}", self.pos))?;
        let code = u32::from_str_radix(digits, 16)
            .map_err(|_| anyhow!("invalid hex escape {:?} at offset {}", digits, self.pos))?;
        self.pos += len;
        char::from_u32(code).ok_or_else(|| anyhow!("escape {:#x} is not a character", code))
    }

    fn number(&mut self) -> Result<Value> {
        let start = self.pos;
        let mut negative = false;
        while let Some(sign @ ('-' | '+')) = self.peek() {
            negative ^= sign == '-';
            self.bump();
            self.skip_ws();
        }

        let body_start = self.pos;
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    self.bump();
                    if let Some('-' | '+') = self.peek() {
                        self.bump();
                    }
                    continue;
                }
                _ => break,
            }
            self.bump();
        }

        let body: String = self.src[body_start..self.pos].chars().filter(|c| *c != '_').collect();
        if body.is_empty() || body == "." {
            bail!("malformed number at offset {}", start);
        }

        if !is_float {
            if let Ok(n) = body.parse::<i64>() {
                return Ok(Value::Number(Number::from(if negative { -n } else { n })));
            }
        }
        let f: f64 = body
            .parse()
            .map_err(|_| anyhow!("malformed number {:?} at offset {}", body, start))?;
        let f = if negative { -f } else { f };
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| anyhow!("number at offset {} is not finite", start))
    }

    fn keyword(&mut self) -> Result<Value> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        match &self.src[start..self.pos] {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            name => bail!("malformed node or string: name {:?} at offset {}", name, start),
        }
    }
}

/// Converts a parsed key into a map key. Only scalar keys are accepted.
fn dict_key(key: Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(true) => Ok("True".to_string()),
        Value::Bool(false) => Ok("False".to_string()),
        Value::Null => Ok("None".to_string()),
        Value::Array(_) | Value::Object(_) => bail!("unsupported dict key {}", key),
    }
}
