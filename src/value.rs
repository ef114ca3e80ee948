//
// Copyright (c) The yangtree Contributors
//
// SPDX-License-Identifier: MIT
//

//! Typed Value Layer: parsing, validation, canonicalisation, and comparison
//! of leaf values against YANG built-in types (`spec.md` §4.2).

use std::cmp::Ordering;

use base64::Engine as _;
use regex::Regex;

use crate::error::{Error, ErrorKind, Result};

/// A YANG built-in type descriptor. Constraints beyond the base kind
/// (length/pattern for strings and binary, numeric range for integers and
/// decimal64) are carried on the descriptor rather than baked into
/// [`TypeKind`], matching how the core treats `must`/`when` as opaque
/// data attached to the schema rather than embedded logic.
#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    pub kind: TypeKind,
    /// Numeric range constraint, applicable to integer and decimal64 kinds.
    /// For decimal64 the bounds are expressed in the type's own scaled
    /// coefficient units.
    pub range: Option<(i128, i128)>,
}

impl TypeDescriptor {
    pub fn new(kind: TypeKind) -> Self {
        TypeDescriptor { kind, range: None }
    }

    #[must_use]
    pub fn with_range(mut self, min: i128, max: i128) -> Self {
        self.range = Some((min, max));
        self
    }
}

#[derive(Clone, Debug)]
pub enum TypeKind {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Decimal64 {
        fraction_digits: u8,
    },
    String {
        length: Option<(u64, u64)>,
        pattern: Option<String>,
    },
    Boolean,
    Enumeration(Vec<String>),
    Bits(Vec<String>),
    IdentityRef,
    InstanceIdentifier,
    /// The boxed descriptor is the leafref's resolved real type, per
    /// `spec.md` §9 Design Notes ("dispatch to the matching codec with the
    /// supplied schema").
    Leafref(Box<TypeDescriptor>),
    Union(Vec<TypeDescriptor>),
    Empty,
    Binary {
        length: Option<(u64, u64)>,
    },
}

/// A canonically-stored leaf value. Decimal64 is always kept as a scaled
/// integer coefficient, never as a float (`spec.md` §4.2); binary is stored
/// decoded; enumerations and bits are stored as their symbolic names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Decimal64 {
        coefficient: i64,
        fraction_digits: u8,
    },
    String(String),
    Boolean(bool),
    Enumeration(String),
    Bits(Vec<String>),
    IdentityRef {
        module: String,
        name: String,
    },
    InstanceIdentifier(String),
    Union(Box<Value>),
    Empty,
    Binary(Vec<u8>),
}

/// Parses `input` against `type_descriptor`, producing a canonically-stored
/// value or an `InvalidValue` error.
pub fn parse(type_descriptor: &TypeDescriptor, input: &str) -> Result<Value> {
    match &type_descriptor.kind {
        TypeKind::Int8 => parse_signed(input, type_descriptor, i8::MIN as i128, i8::MAX as i128)
            .map(|v| Value::Int8(v as i8)),
        TypeKind::Int16 => {
            parse_signed(input, type_descriptor, i16::MIN as i128, i16::MAX as i128)
                .map(|v| Value::Int16(v as i16))
        }
        TypeKind::Int32 => {
            parse_signed(input, type_descriptor, i32::MIN as i128, i32::MAX as i128)
                .map(|v| Value::Int32(v as i32))
        }
        TypeKind::Int64 => {
            parse_signed(input, type_descriptor, i64::MIN as i128, i64::MAX as i128)
                .map(|v| Value::Int64(v as i64))
        }
        TypeKind::Uint8 => {
            parse_unsigned(input, type_descriptor, u8::MAX as u128).map(|v| Value::Uint8(v as u8))
        }
        TypeKind::Uint16 => parse_unsigned(input, type_descriptor, u16::MAX as u128)
            .map(|v| Value::Uint16(v as u16)),
        TypeKind::Uint32 => parse_unsigned(input, type_descriptor, u32::MAX as u128)
            .map(|v| Value::Uint32(v as u32)),
        TypeKind::Uint64 => parse_unsigned(input, type_descriptor, u64::MAX as u128)
            .map(|v| Value::Uint64(v as u64)),
        TypeKind::Decimal64 { fraction_digits } => {
            parse_decimal64(input, *fraction_digits, type_descriptor.range)
        }
        TypeKind::String { length, pattern } => parse_string(input, *length, pattern.as_deref()),
        TypeKind::Boolean => parse_boolean(input),
        TypeKind::Enumeration(values) => parse_enumeration(input, values),
        TypeKind::Bits(values) => parse_bits(input, values),
        TypeKind::IdentityRef => parse_identityref(input),
        TypeKind::InstanceIdentifier => {
            let trimmed = input.trim();
            if trimmed.is_empty() {
                return Err(invalid(input, "instance-identifier"));
            }
            Ok(Value::InstanceIdentifier(trimmed.to_owned()))
        }
        TypeKind::Leafref(real_type) => parse(real_type, input),
        TypeKind::Union(members) => parse_union(input, members),
        TypeKind::Empty => {
            if input.is_empty() {
                Ok(Value::Empty)
            } else {
                Err(invalid(input, "empty"))
            }
        }
        TypeKind::Binary { length } => parse_binary(input, *length),
    }
}

/// Returns the canonical textual form of `value`, per the per-type rules in
/// `spec.md` §4.2/§4.6.
pub fn canonicalise(value: &Value) -> String {
    match value {
        Value::Int8(v) => v.to_string(),
        Value::Int16(v) => v.to_string(),
        Value::Int32(v) => v.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::Uint8(v) => v.to_string(),
        Value::Uint16(v) => v.to_string(),
        Value::Uint32(v) => v.to_string(),
        Value::Uint64(v) => v.to_string(),
        Value::Decimal64 {
            coefficient,
            fraction_digits,
        } => format_decimal64(*coefficient, *fraction_digits),
        Value::String(s) => s.clone(),
        Value::Boolean(b) => b.to_string(),
        Value::Enumeration(s) => s.clone(),
        Value::Bits(names) => names.join(" "),
        Value::IdentityRef { module, name } => format!("{module}:{name}"),
        Value::InstanceIdentifier(s) => s.clone(),
        Value::Union(inner) => canonicalise(inner),
        Value::Empty => String::new(),
        Value::Binary(bytes) => base64::engine::general_purpose::STANDARD.encode(bytes),
    }
}

/// Type-aware equality: two values are equal iff their canonical forms
/// match. This is sound because `canonicalise` always normalises to a
/// single representative string per distinct value within a given type.
pub fn equal(a: &Value, b: &Value) -> bool {
    canonicalise(a) == canonicalise(b)
}

/// A total ordering over scalar values. Numeric types (integers, decimal64)
/// compare by value, not by their canonical text; decimal64 operands are
/// scale-aligned to a common fraction-digit count before their coefficients
/// are compared, so `1.5` and `1.50` order correctly regardless of how each
/// was declared. Everything else (strings, enums, bits, identityrefs, ...)
/// falls back to lexicographic comparison of canonical forms.
///
/// This is distinct from the `ordered-by system` list-insertion rule
/// (`spec.md` §8 invariant 5, Scenario B), which sorts list entries by their
/// canonical *key string* regardless of the key leaf's type — that ordering
/// is implemented directly against key strings in `node.rs` and does not
/// go through this function.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Union(x), _) => compare(x, b),
        (_, Value::Union(y)) => compare(a, y),
        (Value::Int8(x), Value::Int8(y)) => x.cmp(y),
        (Value::Int16(x), Value::Int16(y)) => x.cmp(y),
        (Value::Int32(x), Value::Int32(y)) => x.cmp(y),
        (Value::Int64(x), Value::Int64(y)) => x.cmp(y),
        (Value::Uint8(x), Value::Uint8(y)) => x.cmp(y),
        (Value::Uint16(x), Value::Uint16(y)) => x.cmp(y),
        (Value::Uint32(x), Value::Uint32(y)) => x.cmp(y),
        (Value::Uint64(x), Value::Uint64(y)) => x.cmp(y),
        (
            Value::Decimal64 {
                coefficient: c1,
                fraction_digits: f1,
            },
            Value::Decimal64 {
                coefficient: c2,
                fraction_digits: f2,
            },
        ) => {
            let (aligned1, aligned2) = align_decimal64(*c1, *f1, *c2, *f2);
            aligned1.cmp(&aligned2)
        }
        _ => canonicalise(a).cmp(&canonicalise(b)),
    }
}

/// Scales the coefficient with fewer fraction digits up to match the other's
/// scale, so the two can be compared as plain integers.
fn align_decimal64(c1: i64, f1: u8, c2: i64, f2: u8) -> (i128, i128) {
    let c1 = c1 as i128;
    let c2 = c2 as i128;
    match f1.cmp(&f2) {
        Ordering::Less => (c1 * 10i128.pow((f2 - f1) as u32), c2),
        Ordering::Greater => (c1, c2 * 10i128.pow((f1 - f2) as u32)),
        Ordering::Equal => (c1, c2),
    }
}

fn invalid(input: &str, type_name: &str) -> Error {
    Error::new(
        ErrorKind::InvalidValue,
        format!("'{input}' is not a valid {type_name} value"),
    )
}

fn parse_signed(
    input: &str,
    type_descriptor: &TypeDescriptor,
    min: i128,
    max: i128,
) -> Result<i128> {
    let value: i128 = input
        .trim()
        .parse()
        .map_err(|_| invalid(input, "signed integer"))?;
    let (min, max) = type_descriptor.range.unwrap_or((min, max));
    if value < min || value > max {
        return Err(invalid(input, "signed integer (out of range)"));
    }
    Ok(value)
}

fn parse_unsigned(input: &str, type_descriptor: &TypeDescriptor, max: u128) -> Result<u128> {
    let value: u128 = input
        .trim()
        .parse()
        .map_err(|_| invalid(input, "unsigned integer"))?;
    let (min, max) = type_descriptor
        .range
        .map(|(lo, hi)| (lo.max(0) as u128, hi as u128))
        .unwrap_or((0, max));
    if value < min || value > max {
        return Err(invalid(input, "unsigned integer (out of range)"));
    }
    Ok(value)
}

fn parse_decimal64(
    input: &str,
    fraction_digits: u8,
    range: Option<(i128, i128)>,
) -> Result<Value> {
    let input = input.trim();
    if input.is_empty() {
        return Err(invalid(input, "decimal64"));
    }
    let (sign, rest) = match input.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, input.strip_prefix('+').unwrap_or(input)),
    };
    let mut parts = rest.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next().unwrap_or("");
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(input, "decimal64"));
    }
    if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(input, "decimal64"));
    }
    if frac_part.len() > fraction_digits as usize {
        return Err(invalid(input, "decimal64 (too many fraction digits)"));
    }
    let scale = 10i64.pow(fraction_digits as u32);
    let int_value: i64 = int_part.parse().map_err(|_| invalid(input, "decimal64"))?;
    let mut frac_value: i64 = if frac_part.is_empty() {
        0
    } else {
        frac_part.parse().map_err(|_| invalid(input, "decimal64"))?
    };
    let missing_digits = fraction_digits as usize - frac_part.len();
    frac_value *= 10i64.pow(missing_digits as u32);
    let coefficient = sign * (int_value * scale + frac_value);
    if let Some((min, max)) = range {
        if (coefficient as i128) < min || (coefficient as i128) > max {
            return Err(invalid(input, "decimal64 (out of range)"));
        }
    }
    Ok(Value::Decimal64 {
        coefficient,
        fraction_digits,
    })
}

fn format_decimal64(coefficient: i64, fraction_digits: u8) -> String {
    if fraction_digits == 0 {
        return coefficient.to_string();
    }
    let scale = 10i64.pow(fraction_digits as u32);
    let sign = if coefficient < 0 { "-" } else { "" };
    let magnitude = coefficient.unsigned_abs();
    let int_part = magnitude / scale as u64;
    let frac_part = magnitude % scale as u64;
    format!(
        "{sign}{int_part}.{frac_part:0width$}",
        width = fraction_digits as usize
    )
}

fn parse_string(
    input: &str,
    length: Option<(u64, u64)>,
    pattern: Option<&str>,
) -> Result<Value> {
    if let Some((min, max)) = length {
        let len = input.chars().count() as u64;
        if len < min || len > max {
            return Err(invalid(input, "string (length constraint violated)"));
        }
    }
    if let Some(pattern) = pattern {
        let anchored = format!("^(?:{pattern})$");
        let re = Regex::new(&anchored)
            .map_err(|_| invalid(input, "string (invalid pattern in schema)"))?;
        if !re.is_match(input) {
            return Err(invalid(input, "string (pattern constraint violated)"));
        }
    }
    Ok(Value::String(input.to_owned()))
}

fn parse_boolean(input: &str) -> Result<Value> {
    match input.to_ascii_lowercase().as_str() {
        "true" => Ok(Value::Boolean(true)),
        "false" => Ok(Value::Boolean(false)),
        _ => Err(invalid(input, "boolean")),
    }
}

fn parse_enumeration(input: &str, values: &[String]) -> Result<Value> {
    if values.iter().any(|v| v == input) {
        Ok(Value::Enumeration(input.to_owned()))
    } else {
        Err(invalid(input, "enumeration"))
    }
}

fn parse_bits(input: &str, declared: &[String]) -> Result<Value> {
    let mut set = Vec::new();
    for bit in input.split_whitespace() {
        if !declared.iter().any(|d| d == bit) {
            return Err(invalid(input, "bits"));
        }
        if !set.iter().any(|s: &String| s == bit) {
            set.push(bit.to_owned());
        }
    }
    // Canonical form lists set bits in schema-declared order (RFC 7951 §6.5).
    let ordered: Vec<String> = declared
        .iter()
        .filter(|d| set.contains(d))
        .cloned()
        .collect();
    Ok(Value::Bits(ordered))
}

fn parse_identityref(input: &str) -> Result<Value> {
    let input = input.trim();
    if input.is_empty() {
        return Err(invalid(input, "identityref"));
    }
    match input.split_once(':') {
        Some((module, name)) if !module.is_empty() && !name.is_empty() => Ok(Value::IdentityRef {
            module: module.to_owned(),
            name: name.to_owned(),
        }),
        _ => Err(invalid(input, "identityref (missing module prefix)")),
    }
}

fn parse_union(input: &str, members: &[TypeDescriptor]) -> Result<Value> {
    for member in members {
        if let Ok(value) = parse(member, input) {
            return Ok(Value::Union(Box::new(value)));
        }
    }
    Err(invalid(input, "union (no member type matched)"))
}

fn parse_binary(input: &str, length: Option<(u64, u64)>) -> Result<Value> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|_| invalid(input, "binary (invalid base64)"))?;
    if let Some((min, max)) = length {
        let len = bytes.len() as u64;
        if len < min || len > max {
            return Err(invalid(input, "binary (length constraint violated)"));
        }
    }
    Ok(Value::Binary(bytes))
}

/// Inverse of parsing: builds a [`Value`] for a leaf directly from an
/// already-typed value rather than lexical text. Resolves `spec.md` §9's
/// Design Notes open question (the source's unimplemented
/// `TypedValueToDataNode`) by dispatching on the caller-supplied
/// `TypedInput` tag to the matching constructor.
#[derive(Clone, Debug)]
pub enum TypedInput {
    Int64(i64),
    Uint64(u64),
    Decimal64 { coefficient: i64, fraction_digits: u8 },
    String(String),
    Boolean(bool),
    Binary(Vec<u8>),
    Empty,
}

pub fn from_typed(type_descriptor: &TypeDescriptor, input: TypedInput) -> Result<Value> {
    match (&type_descriptor.kind, input) {
        (TypeKind::Int8, TypedInput::Int64(v)) => i8::try_from(v)
            .map(Value::Int8)
            .map_err(|_| invalid(&v.to_string(), "int8")),
        (TypeKind::Int16, TypedInput::Int64(v)) => i16::try_from(v)
            .map(Value::Int16)
            .map_err(|_| invalid(&v.to_string(), "int16")),
        (TypeKind::Int32, TypedInput::Int64(v)) => i32::try_from(v)
            .map(Value::Int32)
            .map_err(|_| invalid(&v.to_string(), "int32")),
        (TypeKind::Int64, TypedInput::Int64(v)) => Ok(Value::Int64(v)),
        (TypeKind::Uint8, TypedInput::Uint64(v)) => u8::try_from(v)
            .map(Value::Uint8)
            .map_err(|_| invalid(&v.to_string(), "uint8")),
        (TypeKind::Uint16, TypedInput::Uint64(v)) => u16::try_from(v)
            .map(Value::Uint16)
            .map_err(|_| invalid(&v.to_string(), "uint16")),
        (TypeKind::Uint32, TypedInput::Uint64(v)) => u32::try_from(v)
            .map(Value::Uint32)
            .map_err(|_| invalid(&v.to_string(), "uint32")),
        (TypeKind::Uint64, TypedInput::Uint64(v)) => Ok(Value::Uint64(v)),
        (
            TypeKind::Decimal64 { fraction_digits },
            TypedInput::Decimal64 {
                coefficient,
                fraction_digits: given,
            },
        ) if *fraction_digits == given => Ok(Value::Decimal64 {
            coefficient,
            fraction_digits: given,
        }),
        (TypeKind::String { .. }, TypedInput::String(s)) => parse(type_descriptor, &s),
        (TypeKind::Boolean, TypedInput::Boolean(b)) => Ok(Value::Boolean(b)),
        (TypeKind::Binary { length }, TypedInput::Binary(bytes)) => {
            if let Some((min, max)) = length {
                let len = bytes.len() as u64;
                if len < *min || len > *max {
                    return Err(Error::new(
                        ErrorKind::InvalidValue,
                        "binary length constraint violated",
                    ));
                }
            }
            Ok(Value::Binary(bytes))
        }
        (TypeKind::Empty, TypedInput::Empty) => Ok(Value::Empty),
        (TypeKind::Leafref(real), input) => from_typed(real, input),
        (_, input) => Err(Error::new(
            ErrorKind::InvalidValue,
            format!("typed input {input:?} does not match the leaf's declared type"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn td(kind: TypeKind) -> TypeDescriptor {
        TypeDescriptor::new(kind)
    }

    #[test]
    fn decimal64_round_trips_without_float_loss() {
        let descriptor = td(TypeKind::Decimal64 { fraction_digits: 2 });
        let value = parse(&descriptor, "10.1").unwrap();
        assert_eq!(canonicalise(&value), "10.10");
        match value {
            Value::Decimal64 {
                coefficient,
                fraction_digits,
            } => {
                assert_eq!(coefficient, 1010);
                assert_eq!(fraction_digits, 2);
            }
            _ => panic!("expected decimal64"),
        }
    }

    #[test]
    fn decimal64_rejects_excess_fraction_digits() {
        let descriptor = td(TypeKind::Decimal64 { fraction_digits: 1 });
        assert!(parse(&descriptor, "10.123").is_err());
    }

    #[test]
    fn uint32_out_of_range_is_invalid() {
        let descriptor = td(TypeKind::Uint32);
        assert!(parse(&descriptor, "abc").is_err());
        assert!(parse(&descriptor, "4294967296").is_err());
        assert!(parse(&descriptor, "42").is_ok());
    }

    #[test]
    fn boolean_is_case_insensitive_on_input_but_canonical_on_output() {
        let descriptor = td(TypeKind::Boolean);
        let value = parse(&descriptor, "TRUE").unwrap();
        assert_eq!(canonicalise(&value), "true");
    }

    #[test]
    fn bits_canonical_form_follows_schema_order_not_input_order() {
        let descriptor = td(TypeKind::Bits(vec![
            "a".to_owned(),
            "b".to_owned(),
            "c".to_owned(),
        ]));
        let value = parse(&descriptor, "c a").unwrap();
        assert_eq!(canonicalise(&value), "a c");
    }

    #[test]
    fn lexicographic_compare_matches_scenario_b_ordering() {
        let mut words = vec!["first", "second", "third", "fourth"];
        words.sort_by(|a, b| {
            compare(&Value::String(a.to_string()), &Value::String(b.to_string()))
        });
        assert_eq!(words, vec!["first", "fourth", "second", "third"]);
    }

    #[test]
    fn binary_decodes_and_reencodes_canonically() {
        let descriptor = td(TypeKind::Binary { length: None });
        let value = parse(&descriptor, "aGVsbG8=").unwrap();
        assert_eq!(value, Value::Binary(b"hello".to_vec()));
        assert_eq!(canonicalise(&value), "aGVsbG8=");
    }

    #[test]
    fn union_resolves_to_first_matching_member() {
        let descriptor = td(TypeKind::Union(vec![
            td(TypeKind::Uint32),
            td(TypeKind::String {
                length: None,
                pattern: None,
            }),
        ]));
        let numeric = parse(&descriptor, "42").unwrap();
        assert!(matches!(*unwrap_union(numeric), Value::Uint32(42)));
        let text = parse(&descriptor, "hello").unwrap();
        assert!(matches!(*unwrap_union(text), Value::String(_)));
    }

    fn unwrap_union(value: Value) -> Box<Value> {
        match value {
            Value::Union(inner) => inner,
            other => Box::new(other),
        }
    }
}
