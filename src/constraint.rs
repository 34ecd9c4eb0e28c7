//! Subtype constraints as a small expression tree.

use crate::value::Value;
use num_bigint::BigInt;
use std::fmt;
use std::ops::RangeInclusive;

/// A subtype constraint. Bounds are inclusive and `None` is open (MIN/MAX).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constraint {
    /// Permitted integer values, for INTEGER and ENUMERATED.
    ValueRange {
        lower: Option<BigInt>,
        upper: Option<BigInt>,
    },
    /// Permitted number of bits, octets, characters or elements.
    Size {
        lower: Option<usize>,
        upper: Option<usize>,
    },
    SingleValue(Vec<Value>),
    /// Permitted characters of a character string.
    PermittedAlphabet(Vec<RangeInclusive<char>>),
    And(Vec<Constraint>),
    Or(Vec<Constraint>),
    Not(Box<Constraint>),
}

impl Constraint {
    pub fn range(lower: impl Into<BigInt>, upper: impl Into<BigInt>) -> Constraint {
        Constraint::ValueRange {
            lower: Some(lower.into()),
            upper: Some(upper.into()),
        }
    }

    pub fn at_least(lower: impl Into<BigInt>) -> Constraint {
        Constraint::ValueRange {
            lower: Some(lower.into()),
            upper: None,
        }
    }

    pub fn at_most(upper: impl Into<BigInt>) -> Constraint {
        Constraint::ValueRange {
            lower: None,
            upper: Some(upper.into()),
        }
    }

    pub fn size(lower: usize, upper: usize) -> Constraint {
        Constraint::Size {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    pub fn min_size(lower: usize) -> Constraint {
        Constraint::Size {
            lower: Some(lower),
            upper: None,
        }
    }

    pub fn max_size(upper: usize) -> Constraint {
        Constraint::Size {
            lower: None,
            upper: Some(upper),
        }
    }

    pub fn single_value<I, V>(values: I) -> Constraint
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Constraint::SingleValue(values.into_iter().map(Into::into).collect())
    }

    /// Every character of `chars` is permitted.
    pub fn alphabet(chars: &str) -> Constraint {
        Constraint::PermittedAlphabet(chars.chars().map(|c| c..=c).collect())
    }

    pub fn alphabet_range(first: char, last: char) -> Constraint {
        Constraint::PermittedAlphabet(vec![first..=last])
    }

    pub fn and(self, other: Constraint) -> Constraint {
        match self {
            Constraint::And(mut list) => {
                list.push(other);
                Constraint::And(list)
            }
            c => Constraint::And(vec![c, other]),
        }
    }

    pub fn or(self, other: Constraint) -> Constraint {
        match self {
            Constraint::Or(mut list) => {
                list.push(other);
                Constraint::Or(list)
            }
            c => Constraint::Or(vec![c, other]),
        }
    }

    pub fn negate(self) -> Constraint {
        Constraint::Not(Box::new(self))
    }

    pub fn satisfies(&self, value: &Value) -> bool {
        match self {
            Constraint::ValueRange { lower, upper } => match value.as_integer() {
                Some(i) => within(i, lower.as_ref(), upper.as_ref()),
                None => false,
            },
            Constraint::Size { lower, upper } => match size_of(value) {
                Some(n) => within(&n, lower.as_ref(), upper.as_ref()),
                None => false,
            },
            Constraint::SingleValue(values) => values.contains(value),
            Constraint::PermittedAlphabet(ranges) => match value.as_str() {
                Some(s) => s.chars().all(|c| ranges.iter().any(|r| r.contains(&c))),
                None => false,
            },
            Constraint::And(list) => list.iter().all(|c| c.satisfies(value)),
            Constraint::Or(list) => list.iter().any(|c| c.satisfies(value)),
            Constraint::Not(inner) => !inner.satisfies(value),
        }
    }

    /// Check `value`, returning the smallest sub-constraint that fails.
    ///
    /// Under AND that is the first failing operand (recursively); an OR or
    /// NOT fails as a whole.
    pub fn validate(&self, value: &Value) -> Result<(), &Constraint> {
        match self {
            Constraint::And(list) => {
                for c in list {
                    c.validate(value)?;
                }
                Ok(())
            }
            c if c.satisfies(value) => Ok(()),
            c => Err(c),
        }
    }
}

fn within<T: PartialOrd>(v: &T, lower: Option<&T>, upper: Option<&T>) -> bool {
    lower.map_or(true, |l| v >= l) && upper.map_or(true, |u| v <= u)
}

fn size_of(value: &Value) -> Option<usize> {
    match value {
        Value::BitString(bits) => Some(bits.len()),
        Value::OctetString(bytes) => Some(bytes.len()),
        Value::String(s) => Some(s.chars().count()),
        Value::SequenceOf(items) | Value::SetOf(items) => Some(items.len()),
        _ => None,
    }
}

fn write_bounds<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    lower: Option<&T>,
    upper: Option<&T>,
) -> fmt::Result {
    match lower {
        Some(l) => write!(f, "{}", l)?,
        None => write!(f, "MIN")?,
    }
    write!(f, "..")?;
    match upper {
        Some(u) => write!(f, "{}", u),
        None => write!(f, "MAX"),
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, list: &[Constraint], op: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, c) in list.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", op)?;
        }
        write!(f, "{}", c)?;
    }
    write!(f, ")")
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::ValueRange { lower, upper } => {
                write!(f, "(")?;
                write_bounds(f, lower.as_ref(), upper.as_ref())?;
                write!(f, ")")
            }
            Constraint::Size { lower, upper } if lower.is_some() && lower == upper => {
                write!(f, "SIZE({})", lower.unwrap_or_default())
            }
            Constraint::Size { lower, upper } => {
                write!(f, "SIZE(")?;
                write_bounds(f, lower.as_ref(), upper.as_ref())?;
                write!(f, ")")
            }
            Constraint::SingleValue(values) => {
                write!(f, "(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            Constraint::PermittedAlphabet(ranges) => {
                write!(f, "FROM(")?;
                for (i, r) in ranges.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    if r.start() == r.end() {
                        write!(f, "{:?}", r.start())?;
                    } else {
                        write!(f, "{:?}..{:?}", r.start(), r.end())?;
                    }
                }
                write!(f, ")")
            }
            Constraint::And(list) => write_joined(f, list, "INTERSECTION"),
            Constraint::Or(list) => write_joined(f, list, "UNION"),
            Constraint::Not(inner) => write!(f, "(ALL EXCEPT {})", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bit_vec::BitVec;

    #[test]
    fn value_range() {
        let c = Constraint::range(0, 255);
        assert!(c.satisfies(&Value::from(0)));
        assert!(c.satisfies(&Value::from(255)));
        assert!(!c.satisfies(&Value::from(256)));
        assert!(!c.satisfies(&Value::from(-1)));
        // not applicable to strings
        assert!(!c.satisfies(&Value::from("1")));

        assert!(Constraint::at_least(10).satisfies(&Value::from(i64::MAX)));
        assert!(Constraint::at_most(10).satisfies(&Value::from(i64::MIN)));
    }

    #[test]
    fn size() {
        let c = Constraint::size(1, 3);
        assert!(!c.satisfies(&Value::from(Vec::<u8>::new())));
        assert!(c.satisfies(&Value::from(vec![1u8, 2, 3])));
        assert!(c.satisfies(&Value::from("héé")));
        assert!(!c.satisfies(&Value::from("four")));
        assert!(c.satisfies(&Value::BitString(BitVec::from_elem(3, true))));
        assert!(!c.satisfies(&Value::BitString(BitVec::from_elem(8, true))));
        assert!(c.satisfies(&Value::SequenceOf(vec![Value::Null])));
        assert!(Constraint::min_size(2).satisfies(&Value::from(vec![0u8; 1000])));
    }

    #[test]
    fn alphabet_and_values() {
        let digits = Constraint::alphabet_range('0', '9');
        assert!(digits.satisfies(&Value::from("0123")));
        assert!(!digits.satisfies(&Value::from("12a")));
        assert!(Constraint::alphabet("ab").satisfies(&Value::from("abba")));

        let c = Constraint::single_value(vec![1, 3, 5]);
        assert!(c.satisfies(&Value::from(3)));
        assert!(!c.satisfies(&Value::from(4)));
    }

    #[test]
    fn smallest_failing() {
        let lower = Constraint::at_least(0);
        let upper = Constraint::at_most(10);
        let c = lower.clone().and(upper.clone());
        assert_eq!(c.validate(&Value::from(5)), Ok(()));
        assert_eq!(c.validate(&Value::from(11)), Err(&upper));
        assert_eq!(c.validate(&Value::from(-1)), Err(&lower));

        let nested = Constraint::And(vec![
            Constraint::size(1, 8),
            Constraint::And(vec![Constraint::alphabet_range('a', 'z')]),
        ]);
        assert_eq!(
            nested.validate(&Value::from("ABC")),
            Err(&Constraint::alphabet_range('a', 'z'))
        );

        let either = Constraint::range(0, 1).or(Constraint::range(10, 11));
        assert!(either.satisfies(&Value::from(10)));
        assert_eq!(either.validate(&Value::from(5)), Err(&either));

        let not = Constraint::single_value(vec![0]).negate();
        assert!(not.satisfies(&Value::from(1)));
        assert_eq!(not.validate(&Value::from(0)), Err(&not));

        // validating twice gives the same answer
        assert_eq!(c.validate(&Value::from(11)), c.validate(&Value::from(11)));
    }

    #[test]
    fn notation() {
        assert_eq!(Constraint::range(0, 255).to_string(), "(0..255)");
        assert_eq!(Constraint::at_least(1).to_string(), "(1..MAX)");
        assert_eq!(Constraint::size(4, 4).to_string(), "SIZE(4)");
        assert_eq!(Constraint::max_size(8).to_string(), "SIZE(MIN..8)");
        assert_eq!(
            Constraint::alphabet_range('a', 'z').to_string(),
            "FROM('a'..'z')"
        );
        assert_eq!(
            Constraint::range(0, 1).or(Constraint::range(5, 6)).negate().to_string(),
            "(ALL EXCEPT ((0..1) UNION (5..6)))"
        );
    }
}
