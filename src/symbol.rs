use std::cell::RefCell;
use std::str::FromStr;

use fxhash::FxHashMap;
use lazy_static::lazy_static;
use miette::Result;
use regex::Regex;

use crate::error;
use crate::opcodes::Mnemonic;

thread_local! {
    /// Constant values are kept as symbolic text (`$0200`, `%1010`, `12`) so a
    /// later `<`/`>` selector can still pick a byte out of them.
    static CONSTANTS: RefCell<FxHashMap<String, String>> = RefCell::new(FxHashMap::default());
    static LABELS: RefCell<FxHashMap<String, u16>> = RefCell::new(FxHashMap::default());
}

/// Clear both tables. Called at the start of every assemble.
pub fn reset_tables() {
    with_constants(|c| c.clear());
    with_labels(|l| l.clear());
}

/// Access to the constant table via closure
pub fn with_constants<R, F>(f: F) -> R
where
    F: FnOnce(&mut FxHashMap<String, String>) -> R,
{
    CONSTANTS.with_borrow_mut(f)
}

/// Access to the label table via closure
pub fn with_labels<R, F>(f: F) -> R
where
    F: FnOnce(&mut FxHashMap<String, u16>) -> R,
{
    LABELS.with_borrow_mut(f)
}

lazy_static! {
    static ref IDENT: Regex = Regex::new(r"^[A-Za-z_]\w*$").unwrap();
    static ref NUMBER: Regex = Regex::new(r"^(\$[0-9A-Fa-f]+|%[01]+|[0-9]+)$").unwrap();
}

/// Mnemonics, directives, and assignment keywords may not be redefined.
pub fn is_reserved(word: &str) -> bool {
    if Mnemonic::from_str(word).is_ok() {
        return true;
    }
    matches!(
        word.to_ascii_uppercase().as_str(),
        "EQU" | "ORG" | "DEFINE" | ".ORG" | ".DB" | ".DW"
    )
}

pub fn is_ident(word: &str) -> bool {
    IDENT.is_match(word)
}

pub fn is_number(word: &str) -> bool {
    NUMBER.is_match(word)
}

/// A name is at most one of: reserved, constant, label.
pub fn define_constant(name: &str, value: String, line: u32) -> Result<()> {
    if is_reserved(name) {
        return Err(error::reserved_word(name, line));
    }
    if with_labels(|l| l.contains_key(name)) {
        return Err(error::label_and_constant(name, line));
    }
    with_constants(|c| {
        if c.insert(name.to_string(), value).is_some() {
            Err(error::constant_already_defined(name, line))
        } else {
            Ok(())
        }
    })
}

pub fn define_label(name: &str, addr: u16, line: u32) -> Result<()> {
    if is_reserved(name) {
        return Err(error::reserved_word(name, line));
    }
    if with_constants(|c| c.contains_key(name)) {
        return Err(error::label_and_constant(name, line));
    }
    with_labels(|l| {
        if l.insert(name.to_string(), addr).is_some() {
            Err(error::label_already_defined(name, line))
        } else {
            Ok(())
        }
    })
}

pub fn lookup_constant(name: &str) -> Option<String> {
    with_constants(|c| c.get(name).cloned())
}

pub fn lookup_label(name: &str) -> Option<u16> {
    with_labels(|l| l.get(name).copied())
}

/// Parse a numeric literal in its written base: `$` hex, `%` binary, bare
/// decimal.
pub fn convert_value(tok: &str) -> Result<u32> {
    let (digits, radix) = match tok.as_bytes().first() {
        Some(b'$') => (&tok[1..], 16),
        Some(b'%') => (&tok[1..], 2),
        _ => (tok, 10),
    };
    u32::from_str_radix(digits, radix).map_err(|_| error::convert_value(tok))
}

/// Split a one-step expression `base+term` / `base-term` at the operator.
/// The operator must not be the first character, so `-5` stays whole.
pub fn split_expr(text: &str) -> (&str, Option<&str>) {
    let op = text
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '+' || c == '-');
    match op {
        Some((idx, _)) => (&text[..idx], Some(&text[idx..])),
        None => (text, None),
    }
}

/// Evaluate `lhs [rhs]` where `rhs` is `±(literal|constant)`.
///
/// Constant names on either side are substituted first. With no `rhs` the
/// (substituted) `lhs` is returned untouched, base prefix and all. Otherwise
/// both sides are read in the base of `lhs` and the sum is masked to 8 bits,
/// widening to 16 when either operand is wider than a byte. The result keeps
/// the base prefix of `lhs`.
pub fn add_value(lhs: &str, rhs: Option<&str>) -> Result<String> {
    let lhs = lookup_constant(lhs).unwrap_or_else(|| lhs.to_string());
    let Some(rhs) = rhs else { return Ok(lhs) };

    let (sign, term) = match rhs.as_bytes().first() {
        Some(b'+') => (1i64, &rhs[1..]),
        Some(b'-') => (-1i64, &rhs[1..]),
        _ => return Err(error::add_value(&lhs, rhs)),
    };
    let term = match lookup_constant(term) {
        Some(val) => val,
        None if is_ident(term) => return Err(error::constant_not_defined(term)),
        None => term.to_string(),
    };

    let a = convert_value(&lhs)? as i64;
    let b = convert_value(&term)? as i64;
    let mask = if a > 0xFF || b > 0xFF { 0xFFFF } else { 0xFF };
    let sum = (a + sign * b) & mask;

    Ok(match lhs.as_bytes().first() {
        Some(b'$') => format!("${:X}", sum),
        Some(b'%') => format!("%{:b}", sum),
        _ => sum.to_string(),
    })
}

/// Detach a leading `<`/`>` byte selector from an expression.
pub fn split_selector(expr: &str) -> (Option<char>, &str) {
    match expr.as_bytes().first() {
        Some(b'<') => (Some('<'), &expr[1..]),
        Some(b'>') => (Some('>'), &expr[1..]),
        _ => (None, expr),
    }
}

/// Apply a `<` (low byte) or `>` (high byte) selector; `None` passes the
/// value through.
pub fn high_low_byte(value: u32, sel: Option<char>) -> Result<u32> {
    match sel {
        None => Ok(value),
        Some('<') => Ok(value & 0xFF),
        Some('>') => Ok((value >> 8) & 0xFF),
        Some(other) => Err(error::high_low_byte_arg(other)),
    }
}
