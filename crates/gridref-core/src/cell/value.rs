//! Cell value types

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

/// A value produced by evaluation or read from a cell
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellValue {
    /// Empty cell / missing reference
    #[default]
    Null,

    /// Numeric value
    Number(f64),

    /// String value
    Text(String),

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Date/time value
    DateTime(NaiveDateTime),

    /// Structured formula error (#VALUE!, #REF!, etc.)
    Error(ErrorValue),

    /// Row-major grid of values, produced by range references
    Matrix(Vec<Vec<CellValue>>),
}

impl CellValue {
    /// Create a new text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        CellValue::Text(s.into())
    }

    /// Create an error value with the kind's default message
    pub fn error(kind: ErrorKind) -> Self {
        CellValue::Error(ErrorValue::new(kind))
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Check if the value is an error
    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(true) => Some(1.0),
            CellValue::Boolean(false) => Some(0.0),
            _ => None,
        }
    }

    /// Try to get the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            CellValue::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    /// Try to get the value as a string slice
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Number(_) => "number",
            CellValue::Text(_) => "text",
            CellValue::Boolean(_) => "boolean",
            CellValue::DateTime(_) => "datetime",
            CellValue::Error(_) => "error",
            CellValue::Matrix(_) => "matrix",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::DateTime(dt) => write!(f, "{}", dt),
            CellValue::Error(e) => write!(f, "{}", e.kind),
            CellValue::Matrix(rows) => {
                // {1,2;3,4}
                write!(f, "{{")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        write!(f, ";")?;
                    }
                    for (j, v) in row.iter().enumerate() {
                        if j > 0 {
                            write!(f, ",")?;
                        }
                        write!(f, "{}", v)?;
                    }
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::text(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateTime(dt)
    }
}

impl From<ErrorValue> for CellValue {
    fn from(e: ErrorValue) -> Self {
        CellValue::Error(e)
    }
}

/// Spreadsheet error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// #NULL! - Incorrect range operator
    Null,
    /// #DIV/0! - Division by zero
    Div0,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #REF! - Invalid cell reference
    Ref,
    /// #NAME? - Unrecognized formula name
    Name,
    /// #NUM! - Invalid numeric value
    Num,
    /// #N/A - Value not available
    Na,
    /// #CYCLE! - Circular reference
    Circular,
    /// #ERROR! - Anything else
    Generic,
}

impl ErrorKind {
    /// Get the display code for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Null => "#NULL!",
            ErrorKind::Div0 => "#DIV/0!",
            ErrorKind::Value => "#VALUE!",
            ErrorKind::Ref => "#REF!",
            ErrorKind::Name => "#NAME?",
            ErrorKind::Num => "#NUM!",
            ErrorKind::Na => "#N/A",
            ErrorKind::Circular => "#CYCLE!",
            ErrorKind::Generic => "#ERROR!",
        }
    }

    /// Parse an error code (case-insensitive)
    pub fn from_code(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "#NULL!" => Some(ErrorKind::Null),
            "#DIV/0!" => Some(ErrorKind::Div0),
            "#VALUE!" => Some(ErrorKind::Value),
            "#REF!" => Some(ErrorKind::Ref),
            "#NAME?" => Some(ErrorKind::Name),
            "#NUM!" => Some(ErrorKind::Num),
            "#N/A" => Some(ErrorKind::Na),
            "#CYCLE!" => Some(ErrorKind::Circular),
            "#ERROR!" => Some(ErrorKind::Generic),
            _ => None,
        }
    }

    /// Default human-readable message
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::Null => "Ranges do not intersect.",
            ErrorKind::Div0 => "Division by zero.",
            ErrorKind::Value => "Wrong type of argument.",
            ErrorKind::Ref => "Reference does not exist.",
            ErrorKind::Name => "Unknown name.",
            ErrorKind::Num => "Invalid numeric value.",
            ErrorKind::Na => "Value not available.",
            ErrorKind::Circular => "Circular dependency detected.",
            ErrorKind::Generic => "Error.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured formula error: kind plus message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorValue {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorValue {
    /// Error with the kind's default message
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: kind.default_message().to_string(),
        }
    }

    /// Error with a custom message
    pub fn with_message<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(self.kind.as_str())
        } else {
            f.write_str(&self.message)
        }
    }
}

/// Cell datatype tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Datatype {
    Null,
    Number,
    String,
    Date,
    Formula,
    RichText,
    Boolean,
    Error,
    Hyperlink,
    Array,
}

impl Datatype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Datatype::Null => "null",
            Datatype::Number => "number",
            Datatype::String => "string",
            Datatype::Date => "date",
            Datatype::Formula => "formula",
            Datatype::RichText => "richtext",
            Datatype::Boolean => "boolean",
            Datatype::Error => "error",
            Datatype::Hyperlink => "hyperlink",
            Datatype::Array => "array",
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Datatype {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "null" => Datatype::Null,
            "number" => Datatype::Number,
            "string" => Datatype::String,
            "date" => Datatype::Date,
            "formula" => Datatype::Formula,
            "richtext" => Datatype::RichText,
            "boolean" => Datatype::Boolean,
            "error" => Datatype::Error,
            "hyperlink" => Datatype::Hyperlink,
            "array" => Datatype::Array,
            _ => return Err(crate::Error::other(format!("unknown datatype '{}'", s))),
        })
    }
}

/// Classify a value for display
///
/// Null and empty text have no type. Text that reads as a number is a number.
pub fn detect_data_type(value: &CellValue) -> Option<Datatype> {
    match value {
        CellValue::Null => None,
        CellValue::Number(_) => Some(Datatype::Number),
        CellValue::Boolean(_) => Some(Datatype::Boolean),
        CellValue::DateTime(_) => Some(Datatype::Date),
        CellValue::Error(_) => Some(Datatype::Error),
        CellValue::Matrix(_) => Some(Datatype::Array),
        CellValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else if trimmed.parse::<f64>().is_ok() {
                Some(Datatype::Number)
            } else if s == "TRUE" || s == "FALSE" {
                Some(Datatype::Boolean)
            } else {
                Some(Datatype::String)
            }
        }
    }
}

/// What a cell store hands back for one cell
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellConfig {
    /// Raw text as entered (formula text for formula cells)
    pub text: Option<String>,
    /// Computed result of a formula cell
    pub result: Option<CellValue>,
    pub datatype: Option<Datatype>,
    /// Error message of a formula cell's last evaluation
    pub error: Option<String>,
}

impl CellConfig {
    /// A cell holding a number
    pub fn number(value: f64) -> Self {
        Self {
            text: Some(value.to_string()),
            datatype: Some(Datatype::Number),
            ..Default::default()
        }
    }

    /// A cell holding plain text
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: Some(text.into()),
            datatype: Some(Datatype::String),
            ..Default::default()
        }
    }

    /// A formula cell with no computed result yet
    pub fn formula<S: Into<String>>(text: S) -> Self {
        Self {
            text: Some(text.into()),
            datatype: Some(Datatype::Formula),
            ..Default::default()
        }
    }

    /// A boolean cell
    pub fn boolean(value: bool) -> Self {
        Self {
            text: Some(if value { "TRUE" } else { "FALSE" }.to_string()),
            datatype: Some(Datatype::Boolean),
            ..Default::default()
        }
    }

    /// Is this a formula cell?
    pub fn is_formula(&self) -> bool {
        self.datatype == Some(Datatype::Formula)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_detect_data_type() {
        assert_eq!(detect_data_type(&CellValue::Null), None);
        assert_eq!(detect_data_type(&CellValue::text("")), None);
        assert_eq!(detect_data_type(&CellValue::Number(1.5)), Some(Datatype::Number));
        assert_eq!(detect_data_type(&CellValue::text("12")), Some(Datatype::Number));
        assert_eq!(detect_data_type(&CellValue::text("TRUE")), Some(Datatype::Boolean));
        assert_eq!(detect_data_type(&CellValue::Boolean(false)), Some(Datatype::Boolean));
        assert_eq!(detect_data_type(&CellValue::text("hello")), Some(Datatype::String));
        assert_eq!(
            detect_data_type(&CellValue::Matrix(vec![vec![1.0.into()]])),
            Some(Datatype::Array)
        );
        assert_eq!(
            detect_data_type(&CellValue::error(ErrorKind::Div0)),
            Some(Datatype::Error)
        );

        let dt = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        assert_eq!(detect_data_type(&dt.into()), Some(Datatype::Date));
    }

    #[test]
    fn test_error_codes() {
        for kind in [
            ErrorKind::Null,
            ErrorKind::Div0,
            ErrorKind::Value,
            ErrorKind::Ref,
            ErrorKind::Name,
            ErrorKind::Num,
            ErrorKind::Na,
            ErrorKind::Circular,
            ErrorKind::Generic,
        ] {
            assert_eq!(ErrorKind::from_code(kind.as_str()), Some(kind));
        }
        assert_eq!(ErrorKind::from_code("#div/0!"), Some(ErrorKind::Div0));
        assert_eq!(ErrorKind::from_code("#BOGUS"), None);
        assert_eq!(
            ErrorValue::new(ErrorKind::Ref).to_string(),
            "Reference does not exist."
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(CellValue::Boolean(true).to_string(), "TRUE");
        assert_eq!(CellValue::Number(36.0).to_string(), "36");
        let m = CellValue::Matrix(vec![vec![1.0.into(), 2.0.into()], vec![3.0.into(), 4.0.into()]]);
        assert_eq!(m.to_string(), "{1,2;3,4}");
    }

    #[test]
    fn test_datatype_from_str() {
        assert_eq!("formula".parse::<Datatype>().unwrap(), Datatype::Formula);
        assert_eq!("RichText".parse::<Datatype>().unwrap(), Datatype::RichText);
        assert!("nope".parse::<Datatype>().is_err());
    }
}
