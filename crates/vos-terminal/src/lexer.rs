//! Line lexer.
//!
//! Splits one input line into tokens. A double quote at the start of a
//! token opens a literal that runs to the next unescaped double quote, so
//! `cd "My Folder"` yields `["cd", "My Folder"]`. Everything else is split
//! on whitespace.

use std::iter::Peekable;
use std::str::Chars;

use vos_types::diag::Diagnostic;

/// Tokens of one line plus anything worth reporting about it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexed {
    pub tokens: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Lex a line in a single left-to-right pass.
///
/// An unterminated literal is dropped and reported as a high-priority
/// diagnostic; the well-formed tokens before it are kept. Empty tokens
/// (such as `""`) never reach the caller.
pub fn lex(line: &str) -> Lexed {
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch == '"' {
            chars.next();
            match read_literal(&mut chars) {
                Some(literal) => tokens.push(literal),
                None => {
                    tokens.push(String::new());
                    diagnostics.push(Diagnostic::high("Expected closing quote.").emit());
                },
            }
        } else {
            tokens.push(read_word(&mut chars));
        }
    }

    tokens.retain(|t| !t.is_empty());
    Lexed {
        tokens,
        diagnostics,
    }
}

/// Body of a quoted literal, after the opening quote. `None` when the input
/// ends before the closing quote.
fn read_literal(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let mut literal = String::new();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => return Some(literal),
            '\\' => match chars.peek() {
                Some(&next @ ('"' | '\\')) => {
                    literal.push(next);
                    chars.next();
                },
                _ => literal.push('\\'),
            },
            _ => literal.push(ch),
        }
    }
    None
}

fn read_word(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut word = String::new();
    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            break;
        }
        word.push(ch);
        chars.next();
    }
    word
}
