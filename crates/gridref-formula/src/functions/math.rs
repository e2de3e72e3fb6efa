//! Math and aggregate functions

use super::{coerce_number, flatten};
use crate::error::FormulaResult;
use gridref_core::{CellValue, ErrorKind};

/// Numbers among the (flattened) arguments; the first error value wins
fn numbers(args: &[CellValue]) -> Result<Vec<f64>, CellValue> {
    let mut out = Vec::new();
    for value in flatten(args) {
        match value {
            CellValue::Number(n) => out.push(*n),
            CellValue::Error(_) => return Err(value.clone()),
            _ => {} // Ignore non-numeric
        }
    }
    Ok(out)
}

/// SUM function
pub fn fn_sum(args: &[CellValue]) -> FormulaResult<CellValue> {
    Ok(match numbers(args) {
        Ok(values) => CellValue::Number(values.iter().sum()),
        Err(e) => e,
    })
}

/// AVERAGE function
pub fn fn_average(args: &[CellValue]) -> FormulaResult<CellValue> {
    Ok(match numbers(args) {
        Ok(values) if values.is_empty() => CellValue::error(ErrorKind::Div0),
        Ok(values) => CellValue::Number(values.iter().sum::<f64>() / values.len() as f64),
        Err(e) => e,
    })
}

/// MIN function
pub fn fn_min(args: &[CellValue]) -> FormulaResult<CellValue> {
    Ok(match numbers(args) {
        Ok(values) => CellValue::Number(values.into_iter().reduce(f64::min).unwrap_or(0.0)),
        Err(e) => e,
    })
}

/// MAX function
pub fn fn_max(args: &[CellValue]) -> FormulaResult<CellValue> {
    Ok(match numbers(args) {
        Ok(values) => CellValue::Number(values.into_iter().reduce(f64::max).unwrap_or(0.0)),
        Err(e) => e,
    })
}

/// COUNT function
pub fn fn_count(args: &[CellValue]) -> FormulaResult<CellValue> {
    let count = flatten(args)
        .filter(|v| matches!(v, CellValue::Number(_)))
        .count();
    Ok(CellValue::Number(count as f64))
}

/// ABS function
pub fn fn_abs(args: &[CellValue]) -> FormulaResult<CellValue> {
    Ok(match args.first() {
        Some(e @ CellValue::Error(_)) => e.clone(),
        Some(v) => match coerce_number(v) {
            Some(n) => CellValue::Number(n.abs()),
            None => CellValue::error(ErrorKind::Value),
        },
        None => CellValue::error(ErrorKind::Value),
    })
}

/// ROUND function
pub fn fn_round(args: &[CellValue]) -> FormulaResult<CellValue> {
    let number = match args.first() {
        Some(e @ CellValue::Error(_)) => return Ok(e.clone()),
        Some(v) => match coerce_number(v) {
            Some(n) => n,
            None => return Ok(CellValue::error(ErrorKind::Value)),
        },
        None => return Ok(CellValue::error(ErrorKind::Value)),
    };

    let num_digits = match args.get(1) {
        Some(e @ CellValue::Error(_)) => return Ok(e.clone()),
        Some(v) => match coerce_number(v) {
            Some(n) => n.trunc() as i32,
            None => return Ok(CellValue::error(ErrorKind::Value)),
        },
        None => 0,
    };

    // Round half away from zero; negative digits round left of the decimal point
    let multiplier = 10_f64.powi(num_digits);
    let result = if number >= 0.0 {
        (number * multiplier + 0.5).floor() / multiplier
    } else {
        (number * multiplier - 0.5).ceil() / multiplier
    };

    Ok(CellValue::Number(result))
}
