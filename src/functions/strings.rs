//! String helpers: case mapping, base64, trimming, `replace` and glob `match`.

use std::ops::RangeInclusive;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use data_encoding::BASE32;
use regex::Regex;

use super::{string_arg, CallContext, Function, Registry};
use crate::errors::{EvalError, Result};
use crate::value::DynamicValue;
use crate::Evaluator;

pub(super) fn register(registry: &mut Registry) {
    registry.register(StringFn::new("toLower", |s| Ok(s.to_lowercase())));
    registry.register(StringFn::new("toUpper", |s| Ok(s.to_uppercase())));
    registry.register(StringFn::new("toTitle", |s| Ok(s.to_uppercase())));
    registry.register(StringFn::new("title", |s| Ok(title_case(s))));
    registry.register(StringFn::new("b64enc", |s| Ok(STANDARD.encode(s))));
    registry.register(StringFn::new("b64dec", base64_decode));
    registry.register(StringFn::new("b32enc", |s| Ok(BASE32.encode(s.as_bytes()))));
    registry.register(StringFn::new("b32dec", base32_decode));
    registry.register(StringPairFn::new("trimAll", |cutset, s| {
        s.trim_matches(|c| cutset.contains(c)).to_string()
    }));
    registry.register(StringPairFn::new("trimPrefix", |prefix, s| {
        s.strip_prefix(prefix).unwrap_or(s).to_string()
    }));
    registry.register(StringPairFn::new("trimSuffix", |suffix, s| {
        s.strip_suffix(suffix).unwrap_or(s).to_string()
    }));
    registry.register(Replace);
    registry.register(Match);
}

/// One string in, one string out.
pub struct StringFn {
    name: &'static str,
    f: fn(&str) -> Result<String>,
}

impl StringFn {
    pub fn new(name: &'static str, f: fn(&str) -> Result<String>) -> Self {
        Self { name, f }
    }
}

impl Function for StringFn {
    fn name(&self) -> &'static str { self.name }
    fn arity(&self) -> RangeInclusive<usize> { 1..=1 }
    fn call(&self, _: &CallContext<'_>, _: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        if args.len() != 1 {
            return Err(EvalError::arity(format!("{}: requires one argument", self.name)));
        }
        let s = string_arg(self.name, args, 0, "the")?;
        (self.f)(s).map(DynamicValue::String)
    }
}

/// Two strings in, `f(first, second)` out. Sprig argument order: the operand
/// (cutset, prefix, suffix) comes first, the string being trimmed second.
pub struct StringPairFn {
    name: &'static str,
    f: fn(&str, &str) -> String,
}

impl StringPairFn {
    pub fn new(name: &'static str, f: fn(&str, &str) -> String) -> Self {
        Self { name, f }
    }
}

impl Function for StringPairFn {
    fn name(&self) -> &'static str { self.name }
    fn arity(&self) -> RangeInclusive<usize> { 2..=2 }
    fn call(&self, _: &CallContext<'_>, _: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        if args.len() != 2 {
            return Err(EvalError::arity(format!("{}: requires two argument", self.name)));
        }
        let a = string_arg(self.name, args, 0, "first")?;
        let b = string_arg(self.name, args, 1, "second")?;
        Ok(DynamicValue::String((self.f)(a, b)))
    }
}

/// `replace(s, old, new[, n])`; `n` absent or negative replaces every occurrence.
pub struct Replace;
impl Function for Replace {
    fn name(&self) -> &'static str { "replace" }
    fn arity(&self) -> RangeInclusive<usize> { 3..=4 }
    fn call(&self, _: &CallContext<'_>, _: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        self.check_arity(args)?;
        let input = string_arg(self.name(), args, 0, "input")?;
        let old = string_arg(self.name(), args, 1, "old")?;
        let new = string_arg(self.name(), args, 2, "new")?;
        let count = match args.get(3) {
            None => -1,
            Some(DynamicValue::Int(n)) => *n,
            Some(other) => other.to_string().trim().parse::<i64>().map_err(|_| {
                EvalError::type_mismatch("replace: nbOfReplacements must be an int")
            })?,
        };
        let out = match usize::try_from(count) {
            Ok(n) => input.replacen(old, new, n),
            Err(_) => input.replace(old, new),
        };
        Ok(DynamicValue::String(out))
    }
}

/// `match(s, pattern)`: glob test where `*` and `?` stop at `/` and `**` does not.
pub struct Match;
impl Function for Match {
    fn name(&self) -> &'static str { "match" }
    fn arity(&self) -> RangeInclusive<usize> { 2..=2 }
    fn call(&self, _: &CallContext<'_>, _: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        self.check_arity(args)?;
        let pattern = string_arg(self.name(), args, 1, "globPattern")?;
        let candidate = string_arg(self.name(), args, 0, "stringToTest")?;
        let re = glob_regex(pattern).map_err(|e| {
            EvalError::invalid(format!(
                "match: unable to check {candidate} with pattern {pattern}: {e}"
            ))
        })?;
        Ok(DynamicValue::Bool(re.is_match(candidate)))
    }
}

pub(super) fn glob_regex(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    out.push('$');
    Regex::new(&out)
}

/// Upper-cases the first letter of each word. Any ASCII character other than
/// a letter, digit or `_` ends a word, so "don't" becomes "Don'T".
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = is_word_separator(c);
    }
    out
}

fn is_word_separator(c: char) -> bool {
    if c.is_ascii() {
        !(c.is_ascii_alphanumeric() || c == '_')
    } else if c.is_alphanumeric() {
        false
    } else {
        c.is_whitespace()
    }
}

fn base64_decode(s: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(s)
        .map_err(|e| EvalError::invalid(format!("b64dec: {e}")))?;
    String::from_utf8(bytes).map_err(|e| EvalError::invalid(format!("b64dec: {e}")))
}

fn base32_decode(s: &str) -> Result<String> {
    let bytes = BASE32
        .decode(s.as_bytes())
        .map_err(|e| EvalError::invalid(format!("b32dec: {e}")))?;
    String::from_utf8(bytes).map_err(|e| EvalError::invalid(format!("b32dec: {e}")))
}
