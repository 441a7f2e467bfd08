//! A parser library for Valve's KeyValues text format (VDF).
//!
//! Steam keeps its library list (`libraryfolders.vdf`) and its per-app install
//! records (`appmanifest_<id>.acf`) in this format: a quoted key followed by
//! either a quoted value or a `{ ... }` block of further pairs.

mod de;
mod error;

pub use de::{Deserializer, Error, from_object, from_value};
pub use error::ParseError;

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::iter::Peekable;
use std::path::Path;
use std::str::Chars;

use encoding_rs::UTF_8;
use encoding_rs_io::DecodeReaderBytesBuilder;

/// Represents a token scanned from a VDF file.
#[derive(Debug, Clone, PartialEq)]
pub enum VdfToken {
    /// A quoted or bare string (keys and values).
    Str(String),
    /// A platform conditional such as `[$WIN32]`, kept without the brackets.
    Conditional(String),
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
}

/// A value in the parse tree: either a string or a nested block.
#[derive(Debug, Clone, PartialEq)]
pub enum KvValue {
    Str(String),
    Obj(KvObject),
}

impl KvValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            KvValue::Str(s) => Some(s),
            KvValue::Obj(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&KvObject> {
        match self {
            KvValue::Obj(o) => Some(o),
            KvValue::Str(_) => None,
        }
    }
}

/// An ordered block of `key value` pairs.
///
/// Entries keep source order and repeated sibling keys are all retained;
/// lookups by key return the first occurrence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KvObject {
    entries: Vec<(String, KvValue)>,
}

impl KvObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair, keeping any earlier pair with the same key.
    pub fn push(&mut self, key: impl Into<String>, value: KvValue) {
        self.entries.push((key.into(), value));
    }

    pub fn get(&self, key: &str) -> Option<&KvValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// All values stored under `key`, in source order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a KvValue> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(KvValue::as_str)
    }

    pub fn get_object(&self, key: &str) -> Option<&KvObject> {
        self.get(key).and_then(KvValue::as_object)
    }

    /// The first block at this level and its key, whatever that key is.
    pub fn root(&self) -> Option<(&str, &KvObject)> {
        self.entries
            .iter()
            .find_map(|(k, v)| v.as_object().map(|o| (k.as_str(), o)))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, KvValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts the total number of pairs in this subtree.
    pub fn node_count(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, v)| match v {
                KvValue::Str(_) => 1,
                KvValue::Obj(o) => 1 + o.node_count(),
            })
            .sum()
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "\t".repeat(depth);
        for (key, value) in &self.entries {
            match value {
                KvValue::Str(s) => {
                    writeln!(f, "{}\"{}\"\t\t\"{}\"", indent, escape(key), escape(s))?;
                }
                KvValue::Obj(o) => {
                    writeln!(f, "{}\"{}\"", indent, escape(key))?;
                    writeln!(f, "{}{{", indent)?;
                    o.write_indented(f, depth + 1)?;
                    writeln!(f, "{}}}", indent)?;
                }
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a KvObject {
    type Item = &'a (String, KvValue);
    type IntoIter = std::slice::Iter<'a, (String, KvValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Writes the object back out in VDF syntax with tab indentation.
impl fmt::Display for KvObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

pub trait Vdf {
    /// Reads a VDF file as text (UTF-8, BOM stripped) and tokenizes it.
    ///
    /// Tokenizer failures surface as `io::ErrorKind::InvalidData`.
    fn open_vdf(path: &Path) -> io::Result<Vec<VdfToken>> {
        let file = File::open(path)?;
        let mut buf_reader = BufReader::new(
            DecodeReaderBytesBuilder::new()
                .encoding(Some(UTF_8))
                .bom_override(true)
                .build(file),
        );
        let mut contents = String::new();
        buf_reader.read_to_string(&mut contents)?;

        Self::tokenize(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn tokenize(text: &str) -> Result<Vec<VdfToken>, ParseError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut tokens: Vec<VdfToken> = Vec::new();
        let mut chars = text.chars().peekable();
        let mut line = 1;

        while let Some(&c) = chars.peek() {
            match c {
                '\n' => {
                    line += 1;
                    chars.next();
                }
                c if c.is_whitespace() => {
                    chars.next();
                }
                '{' => {
                    tokens.push(VdfToken::LeftBrace);
                    chars.next();
                }
                '}' => {
                    tokens.push(VdfToken::RightBrace);
                    chars.next();
                }
                '"' => {
                    let start_line = line;
                    chars.next(); // consume "
                    let s = read_quoted(&mut chars, &mut line)
                        .ok_or(ParseError::UnterminatedString { line: start_line })?;
                    tokens.push(VdfToken::Str(s));
                }
                '[' => {
                    chars.next(); // consume [
                    let mut cond = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some('\n') | None => {
                                return Err(ParseError::UnterminatedConditional { line });
                            }
                            Some(nc) => cond.push(nc),
                        }
                    }
                    tokens.push(VdfToken::Conditional(cond));
                }
                _ => {
                    let mut s = String::new();
                    while let Some(&nc) = chars.peek() {
                        if nc.is_whitespace() || nc == '"' || nc == '{' || nc == '}' {
                            break;
                        }
                        s.push(nc);
                        chars.next();
                    }
                    if s.starts_with("//") {
                        // Comment: drop the rest of the line
                        while chars.next_if(|&nc| nc != '\n').is_some() {}
                    } else {
                        tokens.push(VdfToken::Str(s));
                    }
                }
            }
        }
        Ok(tokens)
    }

    fn parse_object(
        tokens: &[VdfToken],
        pos: usize,
        nested: bool,
    ) -> Result<(KvObject, usize), ParseError> {
        let mut object = KvObject::new();
        let mut pos = pos;
        loop {
            let Some(tok) = tokens.get(pos) else {
                if nested {
                    return Err(ParseError::UnexpectedEof { position: pos });
                }
                return Ok((object, pos));
            };
            let key = match tok {
                VdfToken::Str(s) => s.clone(),
                VdfToken::RightBrace if nested => return Ok((object, pos + 1)),
                VdfToken::RightBrace => {
                    return Err(ParseError::UnexpectedToken {
                        position: pos,
                        token: "}".to_string(),
                        expected: "a key".to_string(),
                    });
                }
                VdfToken::LeftBrace => {
                    return Err(ParseError::InvalidKey {
                        position: pos,
                        found: "{".to_string(),
                    });
                }
                VdfToken::Conditional(c) => {
                    return Err(ParseError::InvalidKey {
                        position: pos,
                        found: format!("[{}]", c),
                    });
                }
            };

            let mut value_pos = pos + 1;
            // A conditional may sit between a key and its value
            if let Some(VdfToken::Conditional(_)) = tokens.get(value_pos) {
                value_pos += 1;
            }
            let (value, next_pos) = match tokens.get(value_pos) {
                Some(VdfToken::Str(s)) => (KvValue::Str(s.clone()), value_pos + 1),
                Some(VdfToken::LeftBrace) => {
                    let (child, next) = Self::parse_object(tokens, value_pos + 1, true)?;
                    (KvValue::Obj(child), next)
                }
                Some(VdfToken::Conditional(c)) => {
                    return Err(ParseError::UnexpectedToken {
                        position: value_pos,
                        token: format!("[{}]", c),
                        expected: format!("a value for '{}'", key),
                    });
                }
                Some(VdfToken::RightBrace) | None => {
                    return Err(ParseError::MissingValue {
                        position: value_pos,
                        key,
                    });
                }
            };
            object.push(key, value);
            pos = next_pos;

            // Platform conditionals are not evaluated
            if let Some(VdfToken::Conditional(_)) = tokens.get(pos) {
                pos += 1;
            }
        }
    }

    fn parse(tokens: Vec<VdfToken>) -> Result<KvObject, ParseError> {
        let (object, _) = Self::parse_object(&tokens, 0, false)?;
        Ok(object)
    }
}

/// Reads the body of a quoted string after its opening quote.
///
/// Returns `None` if input ends before the closing quote.
fn read_quoted(chars: &mut Peekable<Chars<'_>>, line: &mut usize) -> Option<String> {
    let mut s = String::new();
    loop {
        match chars.next()? {
            '"' => return Some(s),
            '\\' => match chars.next()? {
                'n' => s.push('\n'),
                't' => s.push('\t'),
                '\\' => s.push('\\'),
                '"' => s.push('"'),
                other => {
                    s.push('\\');
                    s.push(other);
                }
            },
            '\n' => {
                *line += 1;
                s.push('\n');
            }
            other => s.push(other),
        }
    }
}

pub struct DefaultVdf {}
impl Vdf for DefaultVdf {}

/// Tokenizes and parses VDF text in one step.
pub fn from_str(text: &str) -> Result<KvObject, ParseError> {
    DefaultVdf::parse(DefaultVdf::tokenize(text)?)
}
