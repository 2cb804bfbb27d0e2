//! Wire formats consumed from the origin endpoints.
//!
//! Both bodies arrive over an opaque request/response transport and are
//! parsed here with bounded buffers, so a malformed or oversized response
//! degrades into the caller's fallback path instead of aborting the cycle.

pub mod alarm;
pub mod menu;

use heapless::Vec;

/// Upper bound for the alarm-config response body.
pub const ALARM_BODY_CAPACITY: usize = 96;

/// Upper bound for the daily-menu response body.
pub const MENU_BODY_CAPACITY: usize = 512;

/// Raw alarm-config response bytes.
pub type AlarmBody = Vec<u8, ALARM_BODY_CAPACITY>;

/// Raw daily-menu response bytes.
pub type MenuBody = Vec<u8, MENU_BODY_CAPACITY>;
