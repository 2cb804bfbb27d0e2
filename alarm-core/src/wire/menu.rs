//! Tokenizer for the daily-menu body.
//!
//! The menu arrives as line-oriented markup, `#<category>:\n<title>\n`
//! repeated per item, or an empty body when no data exists for today. A
//! leading `#` starts an emphasized run that ends at the next newline;
//! every other line is plain text. The renderer maps these segments back to
//! the printer's underline toggles.

use winnow::combinator::{alt, opt, preceded, terminated};
use winnow::prelude::*;
use winnow::token::take_till;

/// One rendered run of menu text.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MenuSegment<'a> {
    /// `#`-led category line, rendered underlined.
    Emphasized(&'a str),
    /// Plain line, including blank separator lines.
    Plain(&'a str),
}

/// Iterator over the segments of a menu body.
#[derive(Clone, Debug)]
pub struct Segments<'a> {
    rest: &'a str,
}

/// Splits a menu body into its rendered segments.
#[must_use]
pub fn segments(text: &str) -> Segments<'_> {
    Segments { rest: text }
}

impl<'a> Iterator for Segments<'a> {
    type Item = MenuSegment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let mut input = self.rest;
        match segment(&mut input) {
            Ok(found) => {
                self.rest = input;
                Some(found)
            }
            Err(_) => {
                // Every arm consumes at least one byte, so this only guards
                // against future grammar edits.
                self.rest = "";
                None
            }
        }
    }
}

fn segment<'a>(input: &mut &'a str) -> ModalResult<MenuSegment<'a>> {
    alt((
        preceded('#', terminated(take_till(0.., '\n'), opt('\n'))).map(MenuSegment::Emphasized),
        terminated(take_till(1.., '\n'), opt('\n')).map(MenuSegment::Plain),
        '\n'.map(|_| MenuSegment::Plain("")),
    ))
    .parse_next(input)
}
