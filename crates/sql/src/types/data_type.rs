//! SQL data types and the implicit-widening lattice

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL data types.
///
/// `Null` is the type of the bare NULL literal; it widens into every other
/// type. `Struct` is the only complex type and never participates in
/// assignment compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    // Integer types
    I8,
    I16,
    I32,
    I64,
    // Float types
    F32,
    F64,
    // Decimal with optional precision and scale
    Decimal(Option<u32>, Option<u32>),
    // String type
    Str,
    // Date/Time types
    Date,
    Timestamp,
    // Named fields, like records
    Struct(Vec<(String, DataType)>),
    // Type of the NULL literal
    Null,
}

impl DataType {
    /// Check if this type is numeric (integer, float, or decimal)
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_floating() || matches!(self, DataType::Decimal(_, _))
    }

    /// Check if this type is a signed integer
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::I8 | DataType::I16 | DataType::I32 | DataType::I64
        )
    }

    /// Check if this type is a floating-point type
    pub fn is_floating(&self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, DataType::Bool)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataType::Null)
    }

    /// Complex types cannot be cast, compared, or assigned across.
    pub fn is_complex(&self) -> bool {
        matches!(self, DataType::Struct(_))
    }

    /// Whether a value of this type can be implicitly widened to `to` without
    /// losing information. Valid implicit conversions only; narrowing is
    /// always rejected here.
    pub fn can_widen_to(&self, to: &DataType) -> bool {
        if self == to {
            return true;
        }

        match (self, to) {
            // NULL widens into anything non-complex
            (DataType::Null, t) => !t.is_complex(),

            // Integer widening conversions (always safe)
            (DataType::I8, DataType::I16 | DataType::I32 | DataType::I64) => true,
            (DataType::I16, DataType::I32 | DataType::I64) => true,
            (DataType::I32, DataType::I64) => true,

            // Float widening
            (DataType::F32, DataType::F64) => true,

            // Integer to float: F32 holds up to 24 bits of mantissa, so only
            // the narrow integers may widen into it
            (DataType::I8 | DataType::I16 | DataType::I32, DataType::F32) => true,
            (DataType::I8 | DataType::I16 | DataType::I32 | DataType::I64, DataType::F64) => true,

            // Integer to decimal
            (i, DataType::Decimal(_, _)) if i.is_integer() => true,

            // Temporal widening
            (DataType::Date, DataType::Timestamp) => true,

            _ => false,
        }
    }

    /// Cost of implicitly widening this type to `to`. Lower is preferred;
    /// `None` means the conversion is not allowed. Used to rank overload
    /// candidates during function resolution.
    pub fn widening_cost(&self, to: &DataType) -> Option<u32> {
        if self == to {
            return Some(0);
        }
        if !self.can_widen_to(to) {
            return None;
        }

        match (self, to) {
            (DataType::Null, _) => Some(1),

            // Integer widening, preferring smaller jumps
            (DataType::I8, DataType::I16) => Some(10),
            (DataType::I8, DataType::I32) => Some(20),
            (DataType::I8, DataType::I64) => Some(30),
            (DataType::I16, DataType::I32) => Some(10),
            (DataType::I16, DataType::I64) => Some(20),
            (DataType::I32, DataType::I64) => Some(10),

            // Integer to float costs more than staying integral
            (_, DataType::F32) => Some(50),
            (DataType::F32, DataType::F64) => Some(10),
            (_, DataType::F64) => Some(60),

            (_, DataType::Decimal(_, _)) => Some(40),
            (DataType::Date, DataType::Timestamp) => Some(10),

            _ => None,
        }
    }

    /// The widest type both sides can be implicitly widened to, or `None` if
    /// the two types have no common assignment-compatible supertype. Complex
    /// types are never compatible, not even with themselves.
    pub fn assignment_compatible(lhs: &DataType, rhs: &DataType) -> Option<DataType> {
        if lhs.is_complex() || rhs.is_complex() {
            return None;
        }
        if lhs == rhs {
            return Some(lhs.clone());
        }
        if rhs.can_widen_to(lhs) {
            return Some(lhs.clone());
        }
        if lhs.can_widen_to(rhs) {
            return Some(rhs.clone());
        }

        // Neither side subsumes the other: walk the numeric chain for the
        // smallest type both widen into (e.g. I64 and F32 meet at F64).
        const CHAIN: &[DataType] = &[
            DataType::I16,
            DataType::I32,
            DataType::I64,
            DataType::F32,
            DataType::F64,
        ];
        CHAIN
            .iter()
            .find(|t| lhs.can_widen_to(t) && rhs.can_widen_to(t))
            .cloned()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "BOOLEAN"),
            DataType::I8 => write!(f, "TINYINT"),
            DataType::I16 => write!(f, "SMALLINT"),
            DataType::I32 => write!(f, "INT"),
            DataType::I64 => write!(f, "BIGINT"),
            DataType::F32 => write!(f, "FLOAT"),
            DataType::F64 => write!(f, "DOUBLE"),
            DataType::Decimal(p, s) => match (p, s) {
                (Some(p), Some(s)) => write!(f, "DECIMAL({},{})", p, s),
                (Some(p), None) => write!(f, "DECIMAL({})", p),
                _ => write!(f, "DECIMAL"),
            },
            DataType::Str => write!(f, "STRING"),
            DataType::Date => write!(f, "DATE"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
            DataType::Struct(fields) => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|(name, dtype)| format!("{}:{}", name, dtype))
                    .collect();
                write!(f, "STRUCT<{}>", fields.join(","))
            }
            DataType::Null => write!(f, "NULL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widening() {
        assert!(DataType::I8.can_widen_to(&DataType::I64));
        assert!(DataType::I32.can_widen_to(&DataType::I64));
        assert!(!DataType::I64.can_widen_to(&DataType::I32));
        assert!(!DataType::I64.can_widen_to(&DataType::F32));
        assert!(DataType::I64.can_widen_to(&DataType::F64));
    }

    #[test]
    fn test_null_widens_everywhere_but_complex() {
        assert!(DataType::Null.can_widen_to(&DataType::Bool));
        assert!(DataType::Null.can_widen_to(&DataType::Timestamp));
        assert!(!DataType::Null.can_widen_to(&DataType::Struct(vec![])));
    }

    #[test]
    fn test_assignment_compatible_meets_in_the_middle() {
        // Neither side subsumes the other, both widen to DOUBLE.
        assert_eq!(
            DataType::assignment_compatible(&DataType::I64, &DataType::F32),
            Some(DataType::F64)
        );
        // The wider side wins when it subsumes the narrower.
        assert_eq!(
            DataType::assignment_compatible(&DataType::I16, &DataType::I64),
            Some(DataType::I64)
        );
        assert_eq!(
            DataType::assignment_compatible(&DataType::Str, &DataType::I64),
            None
        );
    }

    #[test]
    fn test_complex_types_never_compatible() {
        let s = DataType::Struct(vec![("x".into(), DataType::I32)]);
        assert_eq!(DataType::assignment_compatible(&s, &s), None);
    }
}
