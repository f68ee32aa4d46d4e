//! Number and vector formatting for MDL text.

use std::fmt;

/// Digits after the decimal point before trimming.
pub const PRECISION: usize = 6;

/// A float in MDL notation: fixed precision, trailing zeros trimmed, never
/// exponential, and no negative zero.
#[derive(Debug, Clone, Copy)]
pub struct Float(pub f32);

impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = if self.0.is_finite() { self.0 } else { 0.0 };
        let text = format!("{:.*}", PRECISION, value);
        let text = text.trim_end_matches('0').trim_end_matches('.');
        match text {
            "-0" | "" => f.write_str("0"),
            t => f.write_str(t),
        }
    }
}

/// `{a, b, c}` with each component as a [`Float`].
#[derive(Debug, Clone, Copy)]
pub struct Vector<'a>(pub &'a [f32]);

impl fmt::Display for Vector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("{")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", Float(*v))?;
        }
        f.write_str("}")
    }
}

/// Colors are written blue first.
pub fn bgr(color: &[f32; 3]) -> [f32; 3] {
    [color[2], color[1], color[0]]
}

/// A curve value: scalars bare, vectors braced.
#[derive(Debug, Clone, Copy)]
pub struct Value<'a>(pub &'a [f32]);

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            [single] => write!(f, "{}", Float(*single)),
            many => write!(f, "{}", Vector(many)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1.0, "1")]
    #[test_case(0.5, "0.5")]
    #[test_case(-2.25, "-2.25")]
    #[test_case(1e-9, "0")]
    #[test_case(-1e-9, "0")]
    #[test_case(123456.0, "123456")]
    #[test_case(0.333_333_34, "0.333333")]
    #[test_case(f32::NAN, "0")]
    fn floats_are_fixed_point(value: f32, expected: &str) {
        assert_eq!(Float(value).to_string(), expected);
    }

    #[test]
    fn vectors_and_values() {
        assert_eq!(Vector(&[0.0, -1.5, 2.0]).to_string(), "{0, -1.5, 2}");
        assert_eq!(Value(&[3.0]).to_string(), "3");
        assert_eq!(Value(&[0.0, 0.0, 0.0, 1.0]).to_string(), "{0, 0, 0, 1}");
    }
}
