//! Cell address and range types
//!
//! Every address that crosses a component boundary is 1-based: `A1` is row 1,
//! column 1. The only zero-based quantity is the *index* accepted by
//! [`column_to_letters`], so that `letters_to_column(&column_to_letters(n)) == n + 1`.

use crate::error::{Error, Result};
use lazy_regex::regex_captures;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Sheet identifier (the sheet's display name)
pub type SheetId = String;

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A sheet-less grid coordinate (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coord {
    /// Row number (1-based)
    pub row: u32,
    /// Column number (1-based, A = 1)
    pub col: u32,
}

impl Coord {
    /// Create a new coordinate
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Row 0 and column 0 are header sentinels, never real cells
    pub fn is_valid(&self) -> bool {
        self.row >= 1 && self.col >= 1
    }

    /// Move by a signed delta. Returns `None` if the result would leave the grid.
    pub fn offset(&self, delta_row: i64, delta_col: i64) -> Option<Coord> {
        let row = i64::from(self.row) + delta_row;
        let col = i64::from(self.col) + delta_col;
        if row < 1 || col < 1 {
            return None;
        }
        Some(Coord {
            row: u32::try_from(row).ok()?,
            col: u32::try_from(col).ok()?,
        })
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_address(*self))
    }
}

impl FromStr for Coord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_address(s).ok_or_else(|| Error::InvalidAddress(s.to_string()))
    }
}

/// Convert a zero-based column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
pub fn column_to_letters(index: u32) -> String {
    let mut letters = if index >= 26 {
        column_to_letters(index / 26 - 1)
    } else {
        String::new()
    };
    letters.push(ALPHABET[(index % 26) as usize] as char);
    letters
}

/// Convert column letters to a 1-based column number (A = 1, Z = 26, AA = 27)
///
/// Case-insensitive. Returns `None` for empty input, non-letters, or overflow.
pub fn letters_to_column(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }

    let mut acc: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let value = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        acc = acc.checked_mul(26)?.checked_add(value)?;
    }
    Some(acc)
}

/// Parse the first `letters+digits` group in `text` (e.g. "B3", "$B$3", "=SUM(B3)")
///
/// Only the first group is used. Text without a group, or with row 0, is not an
/// address and yields `None`.
pub fn parse_address(text: &str) -> Option<Coord> {
    let (_, letters, digits) = regex_captures!(r"\$?([A-Za-z]+)\$?([0-9]+)", text)?;
    let col = letters_to_column(letters)?;
    let row: u32 = digits.parse().ok()?;
    let coord = Coord::new(row, col);
    coord.is_valid().then_some(coord)
}

/// Format a coordinate in A1 notation
pub fn format_address(coord: Coord) -> String {
    format!(
        "{}{}",
        column_to_letters(coord.col.saturating_sub(1)),
        coord.row
    )
}

/// Quote a sheet name for use in a qualified reference when needed (`'My Sheet'`)
pub fn quote_sheet_name(name: &str) -> Cow<'_, str> {
    let plain = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    if plain {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("'{}'", name.replace('\'', "''")))
    }
}

/// Strip quoting from a sheet qualifier (`'My Sheet'` -> `My Sheet`)
pub fn unquote_sheet_name(name: &str) -> String {
    match name
        .strip_prefix('\'')
        .and_then(|inner| inner.strip_suffix('\''))
    {
        Some(inner) => inner.replace("''", "'"),
        None => name.to_string(),
    }
}

/// Split `Sheet!A1` into the optional sheet qualifier and the remainder
fn split_sheet(text: &str) -> (Option<String>, &str) {
    match text.rfind('!') {
        Some(pos) => (Some(unquote_sheet_name(&text[..pos])), &text[pos + 1..]),
        None => (None, text),
    }
}

/// A sheet-qualified cell address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellAddress {
    /// Owning sheet
    pub sheet: SheetId,
    /// Row number (1-based)
    pub row: u32,
    /// Column number (1-based)
    pub col: u32,
}

impl CellAddress {
    /// Create a new cell address
    pub fn new<S: Into<SheetId>>(sheet: S, row: u32, col: u32) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            col,
        }
    }

    /// Create from a sheet and a coordinate
    pub fn at<S: Into<SheetId>>(sheet: S, coord: Coord) -> Self {
        Self::new(sheet, coord.row, coord.col)
    }

    /// The sheet-less coordinate
    pub fn coord(&self) -> Coord {
        Coord::new(self.row, self.col)
    }

    /// Parse `A1` or `Sheet2!A1`, defaulting to `home_sheet` when unqualified
    pub fn parse_qualified(text: &str, home_sheet: &str) -> Option<Self> {
        let (sheet, rest) = split_sheet(text.trim());
        let coord = parse_exact(rest)?;
        Some(Self::at(sheet.unwrap_or_else(|| home_sheet.to_string()), coord))
    }

    /// Format as A1-style string without the sheet qualifier
    pub fn to_a1_string(&self) -> String {
        format_address(self.coord())
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", quote_sheet_name(&self.sheet), self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    /// Parse a fully qualified address (`Sheet1!B2`)
    fn from_str(s: &str) -> Result<Self> {
        match split_sheet(s.trim()) {
            (Some(sheet), rest) => parse_exact(rest)
                .map(|coord| Self::at(sheet, coord))
                .ok_or_else(|| Error::InvalidAddress(s.to_string())),
            (None, _) => Err(Error::InvalidAddress(format!(
                "missing sheet qualifier in '{}'",
                s
            ))),
        }
    }
}

/// Parse text that must be exactly one `$?letters$?digits` reference
fn parse_exact(text: &str) -> Option<Coord> {
    let (_, letters, digits) = regex_captures!(r"^\$?([A-Za-z]+)\$?([0-9]+)$", text)?;
    let coord = Coord::new(digits.parse().ok()?, letters_to_column(letters)?);
    coord.is_valid().then_some(coord)
}

/// A sheet-qualified rectangular range of cells
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellRange {
    /// Owning sheet
    pub sheet: SheetId,
    /// Top-left corner
    pub from: Coord,
    /// Bottom-right corner
    pub to: Coord,
}

impl CellRange {
    /// Create a new range; corners are normalized so `from` is top-left
    pub fn new<S: Into<SheetId>>(sheet: S, a: Coord, b: Coord) -> Self {
        Self {
            sheet: sheet.into(),
            from: Coord::new(a.row.min(b.row), a.col.min(b.col)),
            to: Coord::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Create a single-cell range
    pub fn single(addr: &CellAddress) -> Self {
        Self::new(addr.sheet.clone(), addr.coord(), addr.coord())
    }

    /// Parse `A1:B3`, `A1` or `Sheet2!A1:B3`, defaulting to `home_sheet`
    pub fn parse_qualified(text: &str, home_sheet: &str) -> Option<Self> {
        let text = text.trim();
        match text.split_once(':') {
            Some((left, right)) => {
                let start = CellAddress::parse_qualified(left, home_sheet)?;
                let end = CellAddress::parse_qualified(right, &start.sheet)?;
                let (from, to) = (start.coord(), end.coord());
                Some(Self::new(start.sheet, from, to))
            }
            None => CellAddress::parse_qualified(text, home_sheet).map(|a| Self::single(&a)),
        }
    }

    /// Is this a single cell?
    pub fn is_single(&self) -> bool {
        self.from == self.to
    }

    /// Check if a cell is within this range
    pub fn contains(&self, addr: &CellAddress) -> bool {
        addr.sheet == self.sheet
            && addr.row >= self.from.row
            && addr.row <= self.to.row
            && addr.col >= self.from.col
            && addr.col <= self.to.col
    }

    /// Get the number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.to.row - self.from.row + 1
    }

    /// Get the number of columns in the range
    pub fn col_count(&self) -> u32 {
        self.to.col - self.from.col + 1
    }

    /// Get the total number of cells in the range
    pub fn cell_count(&self) -> u64 {
        u64::from(self.row_count()) * u64::from(self.col_count())
    }

    /// Iterate over all cell addresses in the range (row by row)
    pub fn cells(&self) -> CellRangeIterator<'_> {
        CellRangeIterator {
            range: self,
            current: self.from,
        }
    }

    /// Format as A1:B10 string without the sheet qualifier
    pub fn to_a1_string(&self) -> String {
        if self.is_single() {
            format_address(self.from)
        } else {
            format!("{}:{}", format_address(self.from), format_address(self.to))
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", quote_sheet_name(&self.sheet), self.to_a1_string())
    }
}

/// Iterator over cells in a range
pub struct CellRangeIterator<'a> {
    range: &'a CellRange,
    current: Coord,
}

impl Iterator for CellRangeIterator<'_> {
    type Item = CellAddress;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.row > self.range.to.row {
            return None;
        }

        let addr = CellAddress::at(self.range.sheet.clone(), self.current);

        self.current.col += 1;
        if self.current.col > self.range.to.col {
            self.current.col = self.range.from.col;
            self.current.row += 1;
        }

        Some(addr)
    }
}
