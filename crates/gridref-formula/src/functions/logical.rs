//! Logical functions

use super::flatten;
use crate::error::{FormulaError, FormulaResult};
use gridref_core::{CellValue, ErrorKind};

/// IF function
pub fn fn_if(args: &[CellValue]) -> FormulaResult<CellValue> {
    let condition = args
        .first()
        .ok_or_else(|| FormulaError::Argument("IF requires at least 2 arguments".into()))?;

    let if_true = args
        .get(1)
        .ok_or_else(|| FormulaError::Argument("IF requires at least 2 arguments".into()))?;

    let if_false = args.get(2);

    // Evaluate condition
    let condition_bool = match condition {
        CellValue::Boolean(b) => *b,
        CellValue::Number(n) => *n != 0.0,
        CellValue::Null => false,
        CellValue::Error(_) => return Ok(condition.clone()),
        _ => return Ok(CellValue::error(ErrorKind::Value)),
    };

    if condition_bool {
        Ok(if_true.clone())
    } else {
        Ok(if_false.cloned().unwrap_or(CellValue::Boolean(false)))
    }
}

/// Truth values among the arguments; the first error value wins
fn truth_values(args: &[CellValue]) -> Result<Vec<bool>, CellValue> {
    let mut out = Vec::new();
    for value in flatten(args) {
        match value {
            CellValue::Boolean(b) => out.push(*b),
            CellValue::Number(n) => out.push(*n != 0.0),
            CellValue::Error(_) => return Err(value.clone()),
            _ => {}
        }
    }
    if out.is_empty() {
        return Err(CellValue::error(ErrorKind::Value));
    }
    Ok(out)
}

/// AND function
pub fn fn_and(args: &[CellValue]) -> FormulaResult<CellValue> {
    Ok(match truth_values(args) {
        Ok(values) => CellValue::Boolean(values.into_iter().all(|b| b)),
        Err(e) => e,
    })
}

/// OR function
pub fn fn_or(args: &[CellValue]) -> FormulaResult<CellValue> {
    Ok(match truth_values(args) {
        Ok(values) => CellValue::Boolean(values.into_iter().any(|b| b)),
        Err(e) => e,
    })
}

/// NOT function
pub fn fn_not(args: &[CellValue]) -> FormulaResult<CellValue> {
    Ok(match args.first() {
        Some(CellValue::Boolean(b)) => CellValue::Boolean(!b),
        Some(CellValue::Number(n)) => CellValue::Boolean(*n == 0.0),
        Some(CellValue::Null) => CellValue::Boolean(true),
        Some(e @ CellValue::Error(_)) => e.clone(),
        _ => CellValue::error(ErrorKind::Value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_if() {
        let yes = CellValue::text("yes");
        let no = CellValue::text("no");
        assert_eq!(
            fn_if(&[CellValue::Boolean(true), yes.clone(), no.clone()]).unwrap(),
            yes
        );
        assert_eq!(fn_if(&[CellValue::Number(0.0), yes.clone(), no.clone()]).unwrap(), no);
        assert_eq!(
            fn_if(&[CellValue::Number(0.0), yes.clone()]).unwrap(),
            CellValue::Boolean(false)
        );
        assert_eq!(
            fn_if(&[CellValue::text("maybe"), yes, no]).unwrap(),
            CellValue::error(ErrorKind::Value)
        );
    }

    #[test]
    fn test_and_or_not() {
        let t = CellValue::Boolean(true);
        let f = CellValue::Boolean(false);
        assert_eq!(fn_and(&[t.clone(), t.clone()]).unwrap(), t);
        assert_eq!(fn_and(&[t.clone(), f.clone()]).unwrap(), f);
        assert_eq!(fn_or(&[f.clone(), CellValue::Number(2.0)]).unwrap(), t);
        assert_eq!(
            fn_or(&[CellValue::text("x")]).unwrap(),
            CellValue::error(ErrorKind::Value)
        );
        assert_eq!(fn_not(&[f]).unwrap(), t);
    }
}
