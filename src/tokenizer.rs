//! Whitespace-separated token reader for the plain-text side files
//! (remap scripts, material libraries).
//!
//! Any byte up to and including space counts as whitespace. A token is either
//! a run of non-whitespace bytes or a `"quoted string"` in which `\"` stands
//! for a literal quote. Reads that would cross a line feed can be refused,
//! which is how callers walk a file line by line.

use glam::Vec3;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::combinator::{opt, value};
use nom::multi::fold_many0;
use nom::number::complete::float;
use nom::sequence::delimited;
use nom::IResult;

fn whitespace(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while(|c| c <= b' ')(input)
}

fn word(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while(|c| c > b' ')(input)
}

fn quoted_chunk(input: &[u8]) -> IResult<&[u8], &[u8]> {
    alt((
        value(&b"\""[..], tag("\\\"")),
        take_while1(|c| c != b'\\' && c != b'"' && c != 0),
        tag("\\"),
    ))(input)
}

/// A quoted string. A missing closing quote runs to the end of input.
fn quoted(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    delimited(
        tag("\""),
        fold_many0(quoted_chunk, Vec::new, |mut acc, chunk: &[u8]| {
            acc.extend_from_slice(chunk);
            acc
        }),
        opt(tag("\"")),
    )(input)
}

fn count_lines(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&c| c == b'\n').count()
}

/// Parses the leading numeric prefix of `token`, or 0.0 when there is none.
pub fn lenient_float(token: &str) -> f32 {
    float::<&[u8], nom::error::Error<&[u8]>>(token.as_bytes())
        .map(|(_, v)| v)
        .unwrap_or(0.0)
}

#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    rest: &'a [u8],
    line: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Tokenizer {
            rest: input,
            line: 1,
        }
    }

    /// 1-based line of the cursor.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn is_eof(&self) -> bool {
        self.rest.is_empty()
    }

    fn read(&mut self, allow_linefeeds: bool, handle_quoted: bool) -> Option<String> {
        if self.rest.is_empty() {
            return None;
        }
        let (after, skipped) = whitespace(self.rest).ok()?;
        let lines = count_lines(skipped);
        if lines > 0 && !allow_linefeeds {
            return None;
        }
        self.line += lines;

        if handle_quoted && after.first() == Some(&b'"') {
            let (rest, token) = quoted(after).ok()?;
            self.line += count_lines(&after[..after.len() - rest.len()]);
            self.rest = rest;
            return Some(String::from_utf8_lossy(&token).into_owned());
        }

        let (rest, token) = word(after).ok()?;
        self.rest = rest;
        Some(String::from_utf8_lossy(token).into_owned())
    }

    /// Next token. Without `allow_linefeeds` this returns `None` at the end
    /// of the current line and leaves the cursor there.
    ///
    /// Trailing whitespace at the end of input yields one empty token.
    pub fn next(&mut self, allow_linefeeds: bool) -> Option<String> {
        self.read(allow_linefeeds, true)
    }

    pub fn skip_rest(&mut self) {
        while self.read(false, false).is_some() {}
    }

    /// Skips a `{ ... }` section, nesting included. The next token must be
    /// the opening brace. `false` if it is not, or if input ends first.
    pub fn skip_braced(&mut self) -> bool {
        let mut level = 0;
        let mut first = true;
        loop {
            let token = match self.next(true) {
                Some(token) => token,
                None => return false,
            };
            if first && !token.starts_with('{') {
                return false;
            }
            first = false;
            match token.as_str() {
                "{" => level += 1,
                "}" => level -= 1,
                _ => {}
            }
            if level == 0 {
                return true;
            }
        }
    }

    /// Reads a token and compares it to `expected`.
    pub fn check(&mut self, allow_linefeeds: bool, expected: &str) -> bool {
        self.next(allow_linefeeds).map_or(false, |t| t == expected)
    }

    pub fn check_ignore_case(&mut self, allow_linefeeds: bool, expected: &str) -> bool {
        self.next(allow_linefeeds)
            .map_or(false, |t| t.eq_ignore_ascii_case(expected))
    }

    /// A number on the current line; unparsable text reads as 0.0.
    pub fn float(&mut self) -> Option<f32> {
        self.next(false).map(|t| lenient_float(&t))
    }

    pub fn int(&mut self) -> Option<i32> {
        self.next(false).map(|t| lenient_float(&t) as i32)
    }

    /// Three numbers on the current line.
    pub fn vec3(&mut self) -> Option<Vec3> {
        let x = self.float()?;
        let y = self.float()?;
        let z = self.float()?;
        Some(Vec3::new(x, y, z))
    }
}
