//! Editor cursor queries over a token stream
//!
//! Cursors are byte offsets into the formula text, marker included, so a cursor
//! at `n` sits between `text[..n]` and `text[n..]`.

use crate::tokenizer::{Token, TokenKind};

/// The call the cursor is currently inside
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Function name, without the paren
    pub function: String,
    /// Zero-based index of the argument under the cursor
    pub argument_index: usize,
}

#[derive(Debug)]
struct Frame<'t> {
    function: Option<&'t Token>,
    argument_index: usize,
}

/// Paren frames still open at `cursor`, outermost first
fn open_frames(tokens: &[Token], cursor: usize) -> Vec<Frame<'_>> {
    let mut stack: Vec<Frame<'_>> = Vec::new();
    for token in tokens
        .iter()
        .filter(|t| !t.is_whitespace() && t.end <= cursor)
    {
        match token.kind {
            TokenKind::FunctionName => stack.push(Frame {
                function: Some(token),
                argument_index: 0,
            }),
            TokenKind::OpenParen => stack.push(Frame {
                function: None,
                argument_index: 0,
            }),
            TokenKind::CloseParen => {
                stack.pop();
            }
            TokenKind::Comma => {
                if let Some(frame) = stack.last_mut() {
                    frame.argument_index += 1;
                }
            }
            _ => {}
        }
    }
    stack
}

/// Innermost unclosed function call containing the cursor
pub fn call_context(tokens: &[Token], cursor: usize) -> Option<CallContext> {
    open_frames(tokens, cursor).iter().rev().find_map(|frame| {
        let name = frame.function?.function_name()?;
        Some(CallContext {
            function: name.to_string(),
            argument_index: frame.argument_index,
        })
    })
}

/// The function the user is typing or is inside of
///
/// An identifier under or just before the cursor wins (`=SUM(SEAR|` gives `SEAR`);
/// otherwise the innermost enclosing call's name token (`SUM(`).
pub fn function_suggestion(tokens: &[Token], cursor: usize) -> Option<Token> {
    let typed = tokens.iter().find(|t| {
        matches!(t.kind, TokenKind::Name | TokenKind::FunctionName)
            && t.start < cursor
            && cursor <= t.end
    });
    if let Some(token) = typed {
        return Some(token.clone());
    }

    open_frames(tokens, cursor)
        .iter()
        .rev()
        .find_map(|frame| frame.function)
        .cloned()
}

/// Whether the editor should offer to insert a cell reference at the cursor
///
/// True right after `=`, after a function's opening paren or a bare `(`, and
/// after a comma inside a call. False inside any token, before an operand that
/// starts at the cursor, and after operands, operators or a closing paren.
pub fn show_cell_suggestions(tokens: &[Token], cursor: usize) -> bool {
    let significant: Vec<&Token> = tokens.iter().filter(|t| !t.is_whitespace()).collect();

    if significant
        .iter()
        .any(|t| t.start < cursor && cursor < t.end)
    {
        return false;
    }
    if significant
        .iter()
        .any(|t| t.start == cursor && t.is_operand())
    {
        return false;
    }

    let previous = significant.iter().rev().find(|t| t.end <= cursor);
    match previous.map(|t| t.kind) {
        None => true,
        Some(TokenKind::FunctionName | TokenKind::OpenParen) => true,
        Some(TokenKind::Comma) => !open_frames(tokens, cursor).is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::normalize_tokens;
    use pretty_assertions::assert_eq;

    /// Split `"=SU|M()"` into the text and the cursor offset
    fn at_cursor(marked: &str) -> (Vec<Token>, usize) {
        let cursor = marked.find('|').unwrap();
        let text = marked.replacen('|', "", 1);
        (normalize_tokens(&text), cursor)
    }

    fn suggestion(marked: &str) -> Option<String> {
        let (tokens, cursor) = at_cursor(marked);
        function_suggestion(&tokens, cursor).map(|t| t.image)
    }

    fn shows_cells(marked: &str) -> bool {
        let (tokens, cursor) = at_cursor(marked);
        show_cell_suggestions(&tokens, cursor)
    }

    #[test]
    fn test_function_suggestion() {
        assert_eq!(suggestion("=S|UM(A1:A2)").as_deref(), Some("SUM("));
        assert_eq!(suggestion("=SUM(SEAR|").as_deref(), Some("SEAR"));
        assert_eq!(suggestion("=SUM(A1, A2, IF|").as_deref(), Some("IF"));
    }

    #[test]
    fn test_function_suggestion_enclosing_call() {
        assert_eq!(suggestion("=SUM(A1, |").as_deref(), Some("SUM("));
        assert_eq!(suggestion("=SUM(A1, IF(B1, |").as_deref(), Some("IF("));
        assert_eq!(suggestion("=SUM(A1) |"), None);
    }

    #[test]
    fn test_show_cell_suggestions() {
        assert!(shows_cells("=SUM(A1, A2, |"));
        assert!(!shows_cells("=SUM(A1, A2|"));
        assert!(!shows_cells("=SUM(A1, A2) |"));
        assert!(!shows_cells("=SUM(A1,A2) + B1  |"));
        assert!(!shows_cells("=SUM(A1,|2)"));
        assert!(!shows_cells("=SU|M()"));
        assert!(shows_cells("=INDEX(|"));
        assert!(shows_cells("=|"));
        assert!(!shows_cells("=CONCAT(\"ab|"));
    }

    #[test]
    fn test_call_context() {
        let (tokens, cursor) = at_cursor("=SUM(A1, IF(B1, C1|");
        assert_eq!(
            call_context(&tokens, cursor),
            Some(CallContext {
                function: "IF".to_string(),
                argument_index: 1,
            })
        );

        let (tokens, cursor) = at_cursor("=SUM(A1, (B1|");
        assert_eq!(
            call_context(&tokens, cursor),
            Some(CallContext {
                function: "SUM".to_string(),
                argument_index: 1,
            })
        );

        let (tokens, cursor) = at_cursor("=SUM(A1)|");
        assert_eq!(call_context(&tokens, cursor), None);
    }
}
