//! Text functions

use super::{coerce_text, flatten};
use crate::error::FormulaResult;
use gridref_core::{CellValue, ErrorKind};

fn first_error<'a>(mut values: impl Iterator<Item = &'a CellValue>) -> Option<CellValue> {
    values.find(|v| v.is_error()).cloned()
}

/// CONCAT function (ranges are flattened)
pub fn fn_concat(args: &[CellValue]) -> FormulaResult<CellValue> {
    if let Some(e) = first_error(flatten(args)) {
        return Ok(e);
    }
    Ok(CellValue::Text(flatten(args).map(coerce_text).collect()))
}

/// CONCATENATE function (scalars only)
pub fn fn_concatenate(args: &[CellValue]) -> FormulaResult<CellValue> {
    if args.iter().any(|a| matches!(a, CellValue::Matrix(_))) {
        return Ok(CellValue::error(ErrorKind::Value));
    }
    if let Some(e) = first_error(args.iter()) {
        return Ok(e);
    }
    Ok(CellValue::Text(args.iter().map(coerce_text).collect()))
}

/// Apply a string transform to the single argument
fn map_text(args: &[CellValue], f: impl Fn(&str) -> CellValue) -> FormulaResult<CellValue> {
    Ok(match args.first() {
        Some(e @ CellValue::Error(_)) => e.clone(),
        Some(CellValue::Matrix(_)) | None => CellValue::error(ErrorKind::Value),
        Some(v) => f(&coerce_text(v)),
    })
}

/// LEN function
pub fn fn_len(args: &[CellValue]) -> FormulaResult<CellValue> {
    map_text(args, |s| CellValue::Number(s.chars().count() as f64))
}

/// UPPER function
pub fn fn_upper(args: &[CellValue]) -> FormulaResult<CellValue> {
    map_text(args, |s| CellValue::Text(s.to_uppercase()))
}

/// LOWER function
pub fn fn_lower(args: &[CellValue]) -> FormulaResult<CellValue> {
    map_text(args, |s| CellValue::Text(s.to_lowercase()))
}
