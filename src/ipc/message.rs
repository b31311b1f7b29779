//! Fixed-size frame exchanged between the scheduler and the billing
//! collaborators.
//!
//! Every frame is [`FRAME_LEN`] bytes:
//! - Byte 0: wire version
//! - Byte 1: message kind
//! - Bytes 2-5: violation id (LE)
//! - Bytes 6-37: airline (length byte + 31 bytes)
//! - Bytes 38-53: flight number (length byte + 15 bytes)
//! - Bytes 54-61: amount (f64 LE)
//! - Bytes 62-65: min speed (LE, signed)
//! - Bytes 66-69: max speed (LE, signed)
//! - Bytes 70-133: details (length byte + 63 bytes)
//!
//! Unused bytes are zero. Text longer than its field is cut on a character
//! boundary when the frame is built.

use crate::aircraft::FlightType;
use crate::error::WireError;
use crate::violation::{Avn, AvnId, Rupees};
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub const WIRE_VERSION: u8 = 1;

const AIRLINE_WIDTH: usize = 32;
const FLIGHT_WIDTH: usize = 16;
const DETAILS_WIDTH: usize = 64;

pub const FRAME_LEN: usize = 2 + 4 + AIRLINE_WIDTH + FLIGHT_WIDTH + 8 + 4 + 4 + DETAILS_WIDTH;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    ViolationCreated = 0,
    PaymentRequest = 1,
    PaymentConfirmation = 2,
    QueryViolation = 3,
    QueryAirline = 4,
}

impl MessageKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(MessageKind::ViolationCreated),
            1 => Some(MessageKind::PaymentRequest),
            2 => Some(MessageKind::PaymentConfirmation),
            3 => Some(MessageKind::QueryViolation),
            4 => Some(MessageKind::QueryAirline),
            _ => None,
        }
    }
}

pub fn type_tag(flight_type: FlightType) -> &'static str {
    match flight_type {
        FlightType::Commercial => "COMMERCIAL",
        FlightType::Cargo => "CARGO",
        FlightType::Emergency => "EMERGENCY",
    }
}

pub fn parse_type_tag(tag: &str) -> Option<FlightType> {
    match tag {
        "COMMERCIAL" => Some(FlightType::Commercial),
        "CARGO" => Some(FlightType::Cargo),
        "EMERGENCY" => Some(FlightType::Emergency),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IpcMessage {
    pub kind: MessageKind,
    pub violation_id: AvnId,
    pub airline: String,
    pub flight_number: String,
    pub amount: f64,
    pub min_speed: i32,
    pub max_speed: i32,
    pub details: String,
}

impl IpcMessage {
    pub fn new(kind: MessageKind) -> Self {
        IpcMessage {
            kind,
            violation_id: 0,
            airline: String::new(),
            flight_number: String::new(),
            amount: 0.0,
            min_speed: 0,
            max_speed: 0,
            details: String::new(),
        }
    }

    /// Hand-off of a freshly detected violation. `amount` carries the
    /// recorded speed, `details` the flight type tag.
    pub fn violation_created(avn: &Avn) -> Self {
        IpcMessage {
            violation_id: avn.id,
            airline: avn.airline.to_string(),
            flight_number: avn.flight_number.to_string(),
            amount: avn.recorded_speed as f64,
            min_speed: avn.band.min,
            max_speed: avn.band.max,
            details: type_tag(avn.flight_type).to_string(),
            ..Self::new(MessageKind::ViolationCreated)
        }
    }

    pub fn payment_request(id: AvnId, airline: &str, amount: Rupees) -> Self {
        IpcMessage {
            violation_id: id,
            airline: airline.to_string(),
            amount: amount as f64,
            ..Self::new(MessageKind::PaymentRequest)
        }
    }

    pub fn payment_confirmation(id: AvnId, airline: &str, amount: f64) -> Self {
        IpcMessage {
            violation_id: id,
            airline: airline.to_string(),
            amount,
            ..Self::new(MessageKind::PaymentConfirmation)
        }
    }

    pub fn query_violation(id: AvnId) -> Self {
        IpcMessage {
            violation_id: id,
            ..Self::new(MessageKind::QueryViolation)
        }
    }

    pub fn query_airline(airline: &str) -> Self {
        IpcMessage {
            airline: airline.to_string(),
            ..Self::new(MessageKind::QueryAirline)
        }
    }

    /// Amount in whole rupees; negative or non-finite amounts read as zero.
    pub fn rupees(&self) -> Rupees {
        self.amount as Rupees
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_LEN);
        buf.put_u8(WIRE_VERSION);
        buf.put_u8(self.kind as u8);
        buf.put_u32_le(self.violation_id);
        put_text(&mut buf, &self.airline, AIRLINE_WIDTH);
        put_text(&mut buf, &self.flight_number, FLIGHT_WIDTH);
        buf.put_f64_le(self.amount);
        buf.put_i32_le(self.min_speed);
        buf.put_i32_le(self.max_speed);
        put_text(&mut buf, &self.details, DETAILS_WIDTH);
        buf.freeze()
    }

    pub fn decode(frame: &[u8]) -> Result<Self, WireError> {
        if frame.len() < FRAME_LEN {
            return Err(WireError::BufferTooShort {
                expected: FRAME_LEN,
                actual: frame.len(),
            });
        }
        let mut buf = &frame[..FRAME_LEN];

        let version = buf.get_u8();
        if version != WIRE_VERSION {
            return Err(WireError::UnsupportedVersion(version));
        }
        let kind_byte = buf.get_u8();
        let kind = MessageKind::from_byte(kind_byte).ok_or(WireError::UnknownKind(kind_byte))?;
        let violation_id = buf.get_u32_le();
        let airline = get_text(&mut buf, "airline", AIRLINE_WIDTH)?;
        let flight_number = get_text(&mut buf, "flight_number", FLIGHT_WIDTH)?;
        let amount = buf.get_f64_le();
        let min_speed = buf.get_i32_le();
        let max_speed = buf.get_i32_le();
        let details = get_text(&mut buf, "details", DETAILS_WIDTH)?;

        Ok(IpcMessage {
            kind,
            violation_id,
            airline,
            flight_number,
            amount,
            min_speed,
            max_speed,
            details,
        })
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a character.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn put_text(buf: &mut BytesMut, text: &str, width: usize) {
    let capacity = width - 1;
    let text = truncate(text, capacity);
    buf.put_u8(text.len() as u8);
    buf.put_slice(text.as_bytes());
    buf.put_bytes(0, capacity - text.len());
}

fn get_text(buf: &mut &[u8], field: &'static str, width: usize) -> Result<String, WireError> {
    let capacity = width - 1;
    let len = buf.get_u8() as usize;
    if len > capacity {
        return Err(WireError::FieldTooLong { field, len, capacity });
    }
    let raw = &buf[..capacity];
    let text = std::str::from_utf8(&raw[..len]).map_err(|_| WireError::InvalidUtf8(field))?;
    let text = text.to_string();
    buf.advance(capacity);
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        let msg = IpcMessage {
            violation_id: 1001,
            airline: "PIA".to_string(),
            flight_number: "PI-1000".to_string(),
            amount: 625.0,
            min_speed: 400,
            max_speed: 600,
            details: "COMMERCIAL".to_string(),
            ..IpcMessage::new(MessageKind::ViolationCreated)
        };
        let frame = msg.encode();

        assert_eq!(FRAME_LEN, frame.len());
        assert_eq!(134, FRAME_LEN);
        assert_eq!(WIRE_VERSION, frame[0]);
        assert_eq!(0, frame[1]);
        assert_eq!(1001u32.to_le_bytes(), frame[2..6]);
        assert_eq!(3, frame[6]);
        assert_eq!(b"PIA", &frame[7..10]);
        assert!(frame[10..38].iter().all(|b| *b == 0));
        assert_eq!(625.0f64.to_le_bytes(), frame[54..62]);
        assert_eq!(msg, IpcMessage::decode(&frame).unwrap());
    }

    #[test]
    fn test_long_text_is_truncated_on_char_boundary() {
        let airline = "é".repeat(20);
        let msg = IpcMessage::query_airline(&airline);
        let decoded = IpcMessage::decode(&msg.encode()).unwrap();
        assert_eq!(30, decoded.airline.len());
        assert_eq!("é".repeat(15), decoded.airline);

        let details = "x".repeat(200);
        let msg = IpcMessage {
            details,
            ..IpcMessage::new(MessageKind::QueryAirline)
        };
        assert_eq!(63, IpcMessage::decode(&msg.encode()).unwrap().details.len());
    }

    #[test]
    fn test_rejects_bad_frames() {
        let frame = IpcMessage::query_violation(7).encode();

        assert_eq!(
            Err(WireError::BufferTooShort { expected: FRAME_LEN, actual: 10 }),
            IpcMessage::decode(&frame[..10])
        );

        let mut bad = frame.to_vec();
        bad[0] = 9;
        assert_eq!(Err(WireError::UnsupportedVersion(9)), IpcMessage::decode(&bad));

        let mut bad = frame.to_vec();
        bad[1] = 42;
        assert_eq!(Err(WireError::UnknownKind(42)), IpcMessage::decode(&bad));

        let mut bad = frame.to_vec();
        bad[6] = 40;
        assert!(matches!(
            IpcMessage::decode(&bad),
            Err(WireError::FieldTooLong { field: "airline", len: 40, capacity: 31 })
        ));

        let mut bad = frame.to_vec();
        bad[6] = 1;
        bad[7] = 0xFF;
        assert_eq!(Err(WireError::InvalidUtf8("airline")), IpcMessage::decode(&bad));
    }

    #[test]
    fn test_type_tags() {
        for flight_type in [FlightType::Commercial, FlightType::Cargo, FlightType::Emergency] {
            assert_eq!(Some(flight_type), parse_type_tag(type_tag(flight_type)));
        }
        assert_eq!(None, parse_type_tag("GLIDER"));
    }
}
