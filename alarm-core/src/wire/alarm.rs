//! Parser for the alarm-config body.
//!
//! The endpoint returns a two-field JSON object, `{"time": <unix seconds>,
//! "active": <bool>}`, in either key order and with arbitrary whitespace.
//! Anything else is a parse failure, which the decision engine treats the
//! same as a failed fetch.

use core::fmt;

use winnow::ascii::{dec_uint, multispace0};
use winnow::combinator::{alt, preceded, separated_pair};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::literal;

use crate::clock::Timestamp;
use crate::engine::AlarmTarget;

/// Reasons an alarm body failed to parse.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AlarmParseError {
    /// Body is not valid UTF-8.
    Encoding,
    /// Body is not the expected two-field object.
    Malformed,
}

impl fmt::Display for AlarmParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlarmParseError::Encoding => f.write_str("alarm body is not utf-8"),
            AlarmParseError::Malformed => f.write_str("alarm body is not the expected object"),
        }
    }
}

/// Parses a raw alarm-config body into an [`AlarmTarget`].
pub fn parse(body: &[u8]) -> Result<AlarmTarget, AlarmParseError> {
    let text = core::str::from_utf8(body).map_err(|_| AlarmParseError::Encoding)?;
    alarm_object.parse(text).map_err(|_| AlarmParseError::Malformed)
}

fn alarm_object(input: &mut &str) -> ModalResult<AlarmTarget> {
    let _ = (multispace0, '{').parse_next(input)?;
    let target = alt((
        separated_pair(time_field, pair_separator, active_field)
            .map(|(time, active)| AlarmTarget::new(Timestamp::from_unix_seconds(time), active)),
        separated_pair(active_field, pair_separator, time_field)
            .map(|(active, time)| AlarmTarget::new(Timestamp::from_unix_seconds(time), active)),
    ))
    .parse_next(input)?;
    let _ = (multispace0, '}', multispace0).parse_next(input)?;
    Ok(target)
}

fn pair_separator(input: &mut &str) -> ModalResult<()> {
    (multispace0, ',', multispace0).void().parse_next(input)
}

fn time_field(input: &mut &str) -> ModalResult<u32> {
    preceded(field_key("time"), dec_uint).parse_next(input)
}

fn active_field(input: &mut &str) -> ModalResult<bool> {
    preceded(field_key("active"), bool_literal).parse_next(input)
}

fn field_key<'a>(name: &'static str) -> impl Parser<&'a str, (), ErrMode<ContextError>> {
    (multispace0, '"', literal(name), '"', multispace0, ':', multispace0).void()
}

fn bool_literal(input: &mut &str) -> ModalResult<bool> {
    alt((literal("true").value(true), literal("false").value(false))).parse_next(input)
}
