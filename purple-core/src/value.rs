//! The typed, polymorphic value system described in spec §3/§4.1.
//!
//! A [`Value`] is a sum type over every representable payload. A [`Port`]
//! (see `crate::port`) holds one written `Value` plus a lazily-populated,
//! append-only cache of conversions to other [`ValueType`]s.

use purple_types::ModuleId;
use std::fmt;

/// The discriminant of a [`Value`] — also the "target type" parameter readers
/// pass when requesting a conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Boolean,
    Int32,
    Uint32,
    Real32,
    Real32Vec2,
    Real32Vec3,
    Real32Vec4,
    Real32Mat4,
    Real64,
    Real64Vec2,
    Real64Vec3,
    Real64Vec4,
    Real64Mat4,
    String,
    ModuleRef,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl ValueType {
    /// Inverse of the `Display` impl, used to round-trip a persisted input's
    /// declared type through XML (spec §6 "each set input (type + value)").
    pub fn parse(name: &str) -> Option<ValueType> {
        Some(match name {
            "Boolean" => ValueType::Boolean,
            "Int32" => ValueType::Int32,
            "Uint32" => ValueType::Uint32,
            "Real32" => ValueType::Real32,
            "Real32Vec2" => ValueType::Real32Vec2,
            "Real32Vec3" => ValueType::Real32Vec3,
            "Real32Vec4" => ValueType::Real32Vec4,
            "Real32Mat4" => ValueType::Real32Mat4,
            "Real64" => ValueType::Real64,
            "Real64Vec2" => ValueType::Real64Vec2,
            "Real64Vec3" => ValueType::Real64Vec3,
            "Real64Vec4" => ValueType::Real64Vec4,
            "Real64Mat4" => ValueType::Real64Mat4,
            "String" => ValueType::String,
            "ModuleRef" => ValueType::ModuleRef,
            _ => return None,
        })
    }
}

pub type Mat4<T> = [[T; 4]; 4];

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Boolean(bool),
    Int32(i32),
    Uint32(u32),
    Real32(f32),
    Real32Vec2([f32; 2]),
    Real32Vec3([f32; 3]),
    Real32Vec4([f32; 4]),
    Real32Mat4(Mat4<f32>),
    Real64(f64),
    Real64Vec2([f64; 2]),
    Real64Vec3([f64; 3]),
    Real64Vec4([f64; 4]),
    Real64Mat4(Mat4<f64>),
    String(String),
    ModuleRef(ModuleId),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Boolean(_) => ValueType::Boolean,
            Value::Int32(_) => ValueType::Int32,
            Value::Uint32(_) => ValueType::Uint32,
            Value::Real32(_) => ValueType::Real32,
            Value::Real32Vec2(_) => ValueType::Real32Vec2,
            Value::Real32Vec3(_) => ValueType::Real32Vec3,
            Value::Real32Vec4(_) => ValueType::Real32Vec4,
            Value::Real32Mat4(_) => ValueType::Real32Mat4,
            Value::Real64(_) => ValueType::Real64,
            Value::Real64Vec2(_) => ValueType::Real64Vec2,
            Value::Real64Vec3(_) => ValueType::Real64Vec3,
            Value::Real64Vec4(_) => ValueType::Real64Vec4,
            Value::Real64Mat4(_) => ValueType::Real64Mat4,
            Value::String(_) => ValueType::String,
            Value::ModuleRef(_) => ValueType::ModuleRef,
        }
    }

    /// The zero-default payload for `ty`, returned whenever a read can't be
    /// satisfied. Reads never fail (spec §4.1 "Failure modes").
    pub fn default_for(ty: ValueType) -> Value {
        match ty {
            ValueType::Boolean => Value::Boolean(false),
            ValueType::Int32 => Value::Int32(0),
            ValueType::Uint32 => Value::Uint32(0),
            ValueType::Real32 => Value::Real32(0.0),
            ValueType::Real32Vec2 => Value::Real32Vec2([0.0; 2]),
            ValueType::Real32Vec3 => Value::Real32Vec3([0.0; 3]),
            ValueType::Real32Vec4 => Value::Real32Vec4([0.0; 4]),
            ValueType::Real32Mat4 => Value::Real32Mat4([[0.0; 4]; 4]),
            ValueType::Real64 => Value::Real64(0.0),
            ValueType::Real64Vec2 => Value::Real64Vec2([0.0; 2]),
            ValueType::Real64Vec3 => Value::Real64Vec3([0.0; 3]),
            ValueType::Real64Vec4 => Value::Real64Vec4([0.0; 4]),
            ValueType::Real64Mat4 => Value::Real64Mat4([[0.0; 4]; 4]),
            ValueType::String => Value::String(String::new()),
            ValueType::ModuleRef => Value::ModuleRef(ModuleId::new(0)),
        }
    }

    /// Converts `self` to `target`, following the rules in spec §4.1.
    /// Never fails: an unrepresentable conversion falls back to the target's
    /// default.
    pub fn convert(&self, target: ValueType) -> Value {
        if self.value_type() == target {
            return self.clone();
        }
        match self {
            Value::String(s) => string_to(s, target),
            Value::ModuleRef(id) => {
                if target == ValueType::String {
                    Value::String(id.to_string())
                } else {
                    Value::default_for(target)
                }
            }
            _ => {
                if let Some(scalar) = self.numeric_magnitude() {
                    numeric_to(scalar, target)
                } else {
                    Value::default_for(target)
                }
            }
        }
    }

    /// Reduces any numeric/vector/matrix payload to a single `f64` scalar:
    /// the value itself for scalars, the Euclidean norm for vectors, the
    /// determinant for 4x4 matrices. `None` for non-numeric payloads.
    pub fn numeric_magnitude(&self) -> Option<f64> {
        Some(match self {
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Int32(v) => *v as f64,
            Value::Uint32(v) => *v as f64,
            Value::Real32(v) => *v as f64,
            Value::Real64(v) => *v,
            Value::Real32Vec2(v) => norm(&[v[0] as f64, v[1] as f64]),
            Value::Real32Vec3(v) => norm(&[v[0] as f64, v[1] as f64, v[2] as f64]),
            Value::Real32Vec4(v) => norm(&[v[0] as f64, v[1] as f64, v[2] as f64, v[3] as f64]),
            Value::Real64Vec2(v) => norm(v),
            Value::Real64Vec3(v) => norm(v),
            Value::Real64Vec4(v) => norm(v),
            Value::Real32Mat4(m) => det4(m, |x| x as f64),
            Value::Real64Mat4(m) => det4(m, |x| x),
            Value::String(_) | Value::ModuleRef(_) => return None,
        })
    }

    /// String rendering used both for the `String` conversion rule and for
    /// node-to-string (first node name) reads elsewhere.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Boolean(b) => b.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Uint32(v) => v.to_string(),
            Value::Real32(v) => format_float(*v as f64),
            Value::Real64(v) => format_float(*v),
            Value::Real32Vec2(v) => bracket(&v.iter().map(|x| format_float(*x as f64)).collect::<Vec<_>>()),
            Value::Real32Vec3(v) => bracket(&v.iter().map(|x| format_float(*x as f64)).collect::<Vec<_>>()),
            Value::Real32Vec4(v) => bracket(&v.iter().map(|x| format_float(*x as f64)).collect::<Vec<_>>()),
            Value::Real64Vec2(v) => bracket(&v.iter().map(|x| format_float(*x)).collect::<Vec<_>>()),
            Value::Real64Vec3(v) => bracket(&v.iter().map(|x| format_float(*x)).collect::<Vec<_>>()),
            Value::Real64Vec4(v) => bracket(&v.iter().map(|x| format_float(*x)).collect::<Vec<_>>()),
            Value::Real32Mat4(m) => bracket_rows(m, |x| format_float(x as f64)),
            Value::Real64Mat4(m) => bracket_rows(m, |x| format_float(x)),
            Value::String(s) => s.clone(),
            Value::ModuleRef(id) => id.to_string(),
        }
    }
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn det4<T: Copy, F: Fn(T) -> f64>(m: &Mat4<T>, conv: F) -> f64 {
    let m: Vec<Vec<f64>> = m.iter().map(|row| row.iter().map(|x| conv(*x)).collect()).collect();
    det_n(&m)
}

/// Laplace expansion along the first row. `n` is small (4) in practice.
fn det_n(m: &[Vec<f64>]) -> f64 {
    let n = m.len();
    if n == 1 {
        return m[0][0];
    }
    let mut det = 0.0;
    for col in 0..n {
        let minor: Vec<Vec<f64>> = m[1..]
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(c, _)| *c != col)
                    .map(|(_, v)| *v)
                    .collect()
            })
            .collect();
        let sign = if col % 2 == 0 { 1.0 } else { -1.0 };
        det += sign * m[0][col] * det_n(&minor);
    }
    det
}

fn format_float(v: f64) -> String {
    // Full-precision round-trippable formatting, per spec §4.1.
    let mut s = format!("{v}");
    if !s.contains('.') && !s.contains('e') && !s.contains("inf") && !s.contains("NaN") {
        s.push_str(".0");
    }
    s
}

fn bracket(parts: &[String]) -> String {
    format!("[{}]", parts.join(" "))
}

fn bracket_rows<T: Copy, F: Fn(T) -> String>(m: &Mat4<T>, fmt: F) -> String {
    let rows: Vec<String> = m.iter().map(|row| bracket(&row.iter().map(|x| fmt(*x)).collect::<Vec<_>>())).collect();
    format!("[{}]", rows.join(""))
}

fn numeric_to(scalar: f64, target: ValueType) -> Value {
    match target {
        ValueType::Boolean => Value::Boolean(is_boolean_true(scalar)),
        ValueType::Int32 => Value::Int32(scalar as i32),
        ValueType::Uint32 => Value::Uint32(if scalar < 0.0 { 0 } else { scalar as u32 }),
        ValueType::Real32 => Value::Real32(scalar as f32),
        ValueType::Real64 => Value::Real64(scalar),
        ValueType::String => Value::String(format_float(scalar)),
        // Converting a scalar into a wider vector/matrix/module-ref shape has
        // no defined source behaviour; fall back to the target's default.
        _ => Value::default_for(target),
    }
}

/// Numeric→boolean per spec §4.1: nonzero for integers, strictly positive for
/// floats (vectors/matrices are reduced to their magnitude first, which is
/// always non-negative, so "positive magnitude" collapses to the same test).
fn is_boolean_true(scalar: f64) -> bool {
    scalar > 0.0 || scalar < 0.0
}

fn string_to(s: &str, target: ValueType) -> Value {
    let trimmed = s.trim();
    match target {
        ValueType::Boolean => {
            let b = trimmed
                .parse::<f64>()
                .map(is_boolean_true)
                .unwrap_or_else(|_| matches!(trimmed.to_ascii_lowercase().as_str(), "true" | "yes"));
            Value::Boolean(b)
        }
        ValueType::Int32 => Value::Int32(trimmed.parse().unwrap_or(0)),
        ValueType::Uint32 => Value::Uint32(trimmed.parse().unwrap_or(0)),
        ValueType::Real32 => Value::Real32(trimmed.parse().unwrap_or(0.0)),
        ValueType::Real64 => Value::Real64(trimmed.parse().unwrap_or(0.0)),
        ValueType::String => Value::String(s.to_string()),
        _ => Value::default_for(target),
    }
}
