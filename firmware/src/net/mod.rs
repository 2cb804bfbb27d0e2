//! UART link to the network co-processor.
//!
//! The radio lives on a co-processor that holds the credentials and the
//! association retry policy; this side only speaks a line protocol over
//! USART2: `JOIN`, `TIME`, and `GET <resource>`, each answered with
//! `+OK [arg]` or `+ERR [reason]`. `GET` replies carry a byte count in the
//! header and the raw body right behind it.
//!
//! One UART serves both the link bring-up and the data fetches, while the
//! wake controller wants those as two collaborators. The transport sits in
//! a `RefCell` and the two handles borrow it per call; the executor runs a
//! single task, so the borrows can never overlap.

use core::cell::RefCell;
use core::fmt::Write as _;

use alarm_core::controller::NetworkLink;
use alarm_core::engine::RemoteSource;
use alarm_core::wire::{AlarmBody, MenuBody};
use embassy_futures::block_on;
use embassy_stm32::mode::Async;
use embassy_stm32::usart::Uart;
use embassy_time::{with_timeout, Duration};
use heapless::{String, Vec};

use crate::hw::clock;
use crate::status::{self, CyclePhase};

/// Reply deadline for everything but `JOIN`.
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// `JOIN` covers the co-processor's own association polling, so it gets
/// the widest budget.
const JOIN_TIMEOUT: Duration = Duration::from_secs(15);

/// Header plus the largest body the menu endpoint may send.
const RX_BUFFER_BYTES: usize = 600;

#[derive(Copy, Clone, Debug, PartialEq, Eq, defmt::Format)]
pub enum LinkError {
    /// No complete reply before the deadline.
    Timeout,
    /// UART-level failure.
    Transport,
    /// The co-processor answered `+ERR`.
    Refused,
    /// Reply did not follow the protocol.
    Malformed,
    /// Body longer than the caller's buffer.
    Overflow,
}

/// Owns the UART and conducts one request/reply exchange at a time.
pub struct CoProcessor {
    uart: Uart<'static, Async>,
}

impl CoProcessor {
    pub fn new(uart: Uart<'static, Async>) -> Self {
        Self { uart }
    }

    fn send_line(&mut self, command: &str) -> Result<(), LinkError> {
        let mut line: String<24> = String::new();
        write!(line, "{command}\r\n").map_err(|_| LinkError::Malformed)?;
        block_on(self.uart.write(line.as_bytes())).map_err(|_| LinkError::Transport)
    }

    /// Accumulates reply bytes until `done` is satisfied or the deadline
    /// passes. Idle gaps delimit the co-processor's bursts.
    fn read_reply(
        &mut self,
        buffer: &mut Vec<u8, RX_BUFFER_BYTES>,
        deadline: Duration,
        done: impl Fn(&[u8]) -> bool,
    ) -> Result<(), LinkError> {
        buffer.clear();
        while !done(buffer) {
            let mut chunk = [0_u8; 64];
            let read = match block_on(with_timeout(deadline, self.uart.read_until_idle(&mut chunk)))
            {
                Ok(Ok(read)) => read,
                Ok(Err(_)) => return Err(LinkError::Transport),
                Err(_) => return Err(LinkError::Timeout),
            };
            buffer
                .extend_from_slice(&chunk[..read])
                .map_err(|_| LinkError::Overflow)?;
        }
        Ok(())
    }

    /// Sends a command and returns the `+OK` argument line.
    fn command(&mut self, command: &str, deadline: Duration) -> Result<String<16>, LinkError> {
        self.send_line(command)?;
        let mut buffer: Vec<u8, RX_BUFFER_BYTES> = Vec::new();
        self.read_reply(&mut buffer, deadline, |bytes| {
            bytes.windows(2).any(|pair| pair == b"\r\n")
        })?;
        let (header, _) = split_header(&buffer)?;
        parse_ok_argument(header)
    }

    /// Sends `GET <resource>` and copies the framed body into `body`.
    fn fetch<const N: usize>(
        &mut self,
        resource: &str,
        body: &mut Vec<u8, N>,
    ) -> Result<(), LinkError> {
        let mut line: String<24> = String::new();
        write!(line, "GET {resource}").map_err(|_| LinkError::Malformed)?;
        self.send_line(&line)?;

        let mut buffer: Vec<u8, RX_BUFFER_BYTES> = Vec::new();
        self.read_reply(&mut buffer, REPLY_TIMEOUT, |bytes| {
            let Ok((header, rest)) = split_header(bytes) else {
                return false;
            };
            match parse_ok_argument(header) {
                Ok(argument) => match argument.parse::<usize>() {
                    Ok(length) => rest.len() >= length,
                    Err(_) => true,
                },
                // `+ERR` needs no body; stop reading and fail below.
                Err(_) => true,
            }
        })?;

        let (header, rest) = split_header(&buffer)?;
        let length: usize = parse_ok_argument(header)?
            .parse()
            .map_err(|_| LinkError::Malformed)?;
        if length > N {
            return Err(LinkError::Overflow);
        }
        body.clear();
        body.extend_from_slice(&rest[..length])
            .map_err(|_| LinkError::Overflow)
    }
}

fn split_header(bytes: &[u8]) -> Result<(&str, &[u8]), LinkError> {
    let end = bytes
        .windows(2)
        .position(|pair| pair == b"\r\n")
        .ok_or(LinkError::Malformed)?;
    let header = core::str::from_utf8(&bytes[..end]).map_err(|_| LinkError::Malformed)?;
    Ok((header, &bytes[end + 2..]))
}

fn parse_ok_argument(header: &str) -> Result<String<16>, LinkError> {
    if let Some(argument) = header.strip_prefix("+OK") {
        String::try_from(argument.trim()).map_err(|_| LinkError::Malformed)
    } else if header.starts_with("+ERR") {
        Err(LinkError::Refused)
    } else {
        Err(LinkError::Malformed)
    }
}

/// [`NetworkLink`] face of the shared co-processor transport.
pub struct LinkHandle {
    transport: &'static RefCell<CoProcessor>,
}

impl LinkHandle {
    pub fn new(transport: &'static RefCell<CoProcessor>) -> Self {
        Self { transport }
    }
}

impl NetworkLink for LinkHandle {
    type Error = LinkError;

    fn bring_up(&mut self) -> Result<(), LinkError> {
        status::record_phase(CyclePhase::Network);
        self.transport
            .borrow_mut()
            .command("JOIN", JOIN_TIMEOUT)
            .map(|_| ())
    }

    fn sync_clock(&mut self) -> Result<(), LinkError> {
        let argument = self.transport.borrow_mut().command("TIME", REPLY_TIMEOUT)?;
        let seconds: u32 = argument.parse().map_err(|_| LinkError::Malformed)?;
        clock::offer_sync(seconds);
        Ok(())
    }
}

/// [`RemoteSource`] face of the shared co-processor transport.
pub struct RemoteHandle {
    transport: &'static RefCell<CoProcessor>,
}

impl RemoteHandle {
    pub fn new(transport: &'static RefCell<CoProcessor>) -> Self {
        Self { transport }
    }
}

impl RemoteSource for RemoteHandle {
    type Error = LinkError;

    fn fetch_alarm(&mut self, body: &mut AlarmBody) -> Result<(), LinkError> {
        status::record_phase(CyclePhase::Resolving);
        self.transport.borrow_mut().fetch("alarm", body)
    }

    fn fetch_menu(&mut self, body: &mut MenuBody) -> Result<(), LinkError> {
        self.transport.borrow_mut().fetch("menu", body)
    }
}
