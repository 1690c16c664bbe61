//! Raw values handed to `FromSql`

use diesel::deserialize;

use crate::driver::SqlValue;

/// A non-NULL value from a fetched row
#[derive(Debug, Clone, Copy)]
pub struct MssqlValue<'a> {
    value: &'a SqlValue,
}

impl<'a> MssqlValue<'a> {
    pub(crate) fn new(value: &'a SqlValue) -> Self {
        Self { value }
    }

    /// The driver value behind this cell
    pub fn as_sql_value(&self) -> &'a SqlValue {
        self.value
    }

    /// Read an exact integer
    ///
    /// Drivers return DECIMAL/NUMERIC (and therefore `scope_identity()`) as
    /// text such as `42` or `42.000`; both are accepted.
    pub(crate) fn read_integer(&self) -> deserialize::Result<i64> {
        match self.value {
            SqlValue::Integer(n) => Ok(*n),
            SqlValue::Text(s) => crate::execution_context::parse_integral(s)
                .ok_or_else(|| format!("`{}` is not an integer", s).into()),
            SqlValue::Double(d) if d.fract() == 0.0 => Ok(*d as i64),
            other => Err(format!("expected an integer, got {:?}", other).into()),
        }
    }

    pub(crate) fn read_double(&self) -> deserialize::Result<f64> {
        match self.value {
            SqlValue::Double(d) => Ok(*d),
            SqlValue::Integer(n) => Ok(*n as f64),
            SqlValue::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("`{}` is not a number", s).into()),
            other => Err(format!("expected a number, got {:?}", other).into()),
        }
    }

    pub(crate) fn read_text(&self) -> deserialize::Result<&'a str> {
        match self.value {
            SqlValue::Text(s) => Ok(s.as_str()),
            other => Err(format!("expected text, got {:?}", other).into()),
        }
    }

    pub(crate) fn read_blob(&self) -> deserialize::Result<&'a [u8]> {
        match self.value {
            SqlValue::Binary(b) => Ok(b.as_slice()),
            other => Err(format!("expected binary data, got {:?}", other).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_integer() {
        let value = SqlValue::Integer(42);
        assert_eq!(MssqlValue::new(&value).read_integer().unwrap(), 42);
    }

    #[test]
    fn test_read_integer_from_decimal_text() {
        let value = SqlValue::Text("42.000".into());
        assert_eq!(MssqlValue::new(&value).read_integer().unwrap(), 42);

        let value = SqlValue::Text("4.5".into());
        assert!(MssqlValue::new(&value).read_integer().is_err());
    }

    #[test]
    fn test_read_double() {
        let value = SqlValue::Integer(3);
        assert!((MssqlValue::new(&value).read_double().unwrap() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_read_text_mismatch() {
        let value = SqlValue::Binary(vec![1]);
        assert!(MssqlValue::new(&value).read_text().is_err());
    }

    #[test]
    fn test_read_blob() {
        let value = SqlValue::Binary(b"hello".to_vec());
        assert_eq!(MssqlValue::new(&value).read_blob().unwrap(), b"hello");
    }
}
