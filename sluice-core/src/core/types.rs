//! Zero-overhead event types
//!
//! All types in this module are designed for:
//! - Zero heap allocations
//! - Copy semantics
//! - Cache-line alignment (records never share a line)

use std::fmt;
use std::time::Instant;

/// Size of a cache line on every target we care about
pub const CACHE_LINE: usize = 64;

/// Kind of market event carried by a record
///
/// Single byte enum for minimal size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    NewOrder = 0,
    Cancel = 1,
    Modify = 2,
    QuoteUpdate = 3,
    Trade = 4,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::NewOrder => write!(f, "NEW_ORDER"),
            EventKind::Cancel => write!(f, "CANCEL"),
            EventKind::Modify => write!(f, "MODIFY"),
            EventKind::QuoteUpdate => write!(f, "QUOTE_UPDATE"),
            EventKind::Trade => write!(f, "TRADE"),
        }
    }
}

/// Order side (Buy or Sell)
///
/// Single byte enum for minimal size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Caller-supplied payload of one event
///
/// This is what the ingestion side hands to `IngestionPort::submit`. The core
/// adds the sequence number and publish timestamp when it writes the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventFields {
    pub kind: EventKind,
    pub instrument: u32,
    /// Fixed-point price, see [`fixed_point`]
    pub price: i64,
    pub quantity: u64,
    pub side: Side,
    /// Ingestion timestamp in nanoseconds (caller's clock)
    pub ingest_ts_ns: u64,
}

/// One market event - exactly 64 bytes (one cache line).
///
/// # Memory Layout
///
/// | Field         | Type     | Offset | Size |
/// |---------------|----------|--------|------|
/// | sequence      | u64      | 0      | 8    |
/// | kind          | u8       | 8      | 1    |
/// | side          | u8       | 9      | 1    |
/// | (padding)     | [u8; 2]  | 10     | 2    |
/// | instrument    | u32      | 12     | 4    |
/// | price         | i64      | 16     | 8    |
/// | quantity      | u64      | 24     | 8    |
/// | ingest_ts_ns  | u64      | 32     | 8    |
/// | publish_ts_ns | u64      | 40     | 8    |
/// | _reserved     | [u8; 16] | 48     | 16   |
/// | **Total**     |          |        | 64   |
#[repr(C, align(64))]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    // === Hot data (read first by the consumer) ===
    /// Monotonic sequence number assigned by the ingestion port (starts at 1)
    pub sequence: u64,
    pub kind: EventKind,
    pub side: Side,
    _pad: [u8; 2],

    // === Payload ===
    pub instrument: u32,
    /// Fixed-point price (9 decimal places)
    pub price: i64,
    pub quantity: u64,
    /// Caller-supplied ingestion timestamp (ns)
    pub ingest_ts_ns: u64,
    /// Stamped by the core right before publish, on the core clock (ns)
    pub publish_ts_ns: u64,

    _reserved: [u8; 16],
}

const _: () = assert!(
    std::mem::size_of::<EventRecord>() == CACHE_LINE,
    "EventRecord must be exactly one cache line"
);

const _: () = assert!(
    std::mem::align_of::<EventRecord>() == CACHE_LINE,
    "EventRecord must be cache-line aligned"
);

impl EventRecord {
    /// Empty record used to pre-fill pool slots
    #[inline]
    pub const fn empty() -> Self {
        Self {
            sequence: 0,
            kind: EventKind::NewOrder,
            side: Side::Buy,
            _pad: [0; 2],
            instrument: 0,
            price: 0,
            quantity: 0,
            ingest_ts_ns: 0,
            publish_ts_ns: 0,
            _reserved: [0; 16],
        }
    }

    /// Overwrite the payload with caller fields and core bookkeeping
    #[inline(always)]
    pub fn fill(&mut self, sequence: u64, fields: &EventFields, publish_ts_ns: u64) {
        self.sequence = sequence;
        self.kind = fields.kind;
        self.side = fields.side;
        self.instrument = fields.instrument;
        self.price = fields.price;
        self.quantity = fields.quantity;
        self.ingest_ts_ns = fields.ingest_ts_ns;
        self.publish_ts_ns = publish_ts_ns;
    }

    /// Caller-visible payload of this record
    #[inline]
    pub fn fields(&self) -> EventFields {
        EventFields {
            kind: self.kind,
            instrument: self.instrument,
            price: self.price,
            quantity: self.quantity,
            side: self.side,
            ingest_ts_ns: self.ingest_ts_ns,
        }
    }
}

impl Default for EventRecord {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRecord")
            .field("sequence", &self.sequence)
            .field("kind", &self.kind)
            .field("side", &self.side)
            .field("instrument", &self.instrument)
            .field("price", &self.price)
            .field("quantity", &self.quantity)
            .field("ingest_ts_ns", &self.ingest_ts_ns)
            .field("publish_ts_ns", &self.publish_ts_ns)
            .finish()
    }
}

/// Monotonic nanosecond clock shared by producer and consumer
///
/// Both sides copy the same origin, so publish and processed timestamps are
/// directly comparable without any shared state.
#[derive(Debug, Clone, Copy)]
pub struct CoreClock {
    origin: Instant,
}

impl CoreClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Nanoseconds since the clock was created
    #[inline(always)]
    pub fn now_ns(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

impl Default for CoreClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-point price helpers (9 decimal places)
pub mod fixed_point {
    use crate::core::errors::ConversionError;

    /// Scale factor for 9 decimal places
    pub const SCALE: i64 = 1_000_000_000;

    /// Convert f64 to fixed-point i64
    ///
    /// Only meant for ingestion edges that receive floats; the core never
    /// does float arithmetic on prices.
    pub fn from_f64(value: f64) -> Result<i64, ConversionError> {
        if value.is_nan() {
            return Err(ConversionError::NotANumber);
        }
        if value.is_infinite() {
            return Err(ConversionError::Infinite {
                positive: value.is_sign_positive(),
            });
        }
        let scaled = (value * SCALE as f64).round();
        if scaled >= i64::MAX as f64 || scaled <= i64::MIN as f64 {
            return Err(ConversionError::OutOfRange { value });
        }
        Ok(scaled as i64)
    }

    /// Convert fixed-point i64 to f64 (display only)
    #[inline(always)]
    pub fn to_f64(value: i64) -> f64 {
        value as f64 / SCALE as f64
    }

    /// Build a price from whole units and nano-units
    #[inline(always)]
    pub const fn from_parts(units: i64, nanos: i64) -> i64 {
        units * SCALE + nanos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, offset_of, size_of};

    #[test]
    fn test_record_layout() {
        assert_eq!(size_of::<EventRecord>(), 64);
        assert_eq!(align_of::<EventRecord>(), 64);

        // Hot fields first
        assert_eq!(offset_of!(EventRecord, sequence), 0);
        assert_eq!(offset_of!(EventRecord, kind), 8);
        assert_eq!(offset_of!(EventRecord, side), 9);
        assert_eq!(offset_of!(EventRecord, instrument), 12);
        assert_eq!(offset_of!(EventRecord, price), 16);
        assert_eq!(offset_of!(EventRecord, publish_ts_ns), 40);
    }

    #[test]
    fn test_records_never_share_a_line() {
        let records = [EventRecord::empty(); 4];
        let a = &records[0] as *const _ as usize;
        let b = &records[1] as *const _ as usize;
        assert_eq!(b - a, CACHE_LINE);
        assert_eq!(a % CACHE_LINE, 0);
    }

    #[test]
    fn test_fill_and_fields() {
        let fields = EventFields {
            kind: EventKind::QuoteUpdate,
            instrument: 42,
            price: fixed_point::from_parts(50_000, 500_000_000),
            quantity: 7,
            side: Side::Sell,
            ingest_ts_ns: 123,
        };

        let mut record = EventRecord::empty();
        record.fill(9, &fields, 456);

        assert_eq!(record.sequence, 9);
        assert_eq!(record.publish_ts_ns, 456);
        assert_eq!(record.fields(), fields);
    }

    #[test]
    fn test_fixed_point_conversion() {
        assert_eq!(fixed_point::from_f64(1.5).unwrap(), 1_500_000_000);
        assert_eq!(fixed_point::from_f64(-0.25).unwrap(), -250_000_000);
        assert_eq!(fixed_point::to_f64(2_500_000_000), 2.5);
        assert!(fixed_point::from_f64(f64::NAN).is_err());
        assert!(fixed_point::from_f64(f64::INFINITY).is_err());
        assert!(fixed_point::from_f64(1e20).is_err());
    }

    #[test]
    fn test_side_and_kind_display() {
        assert_eq!(format!("{}", Side::Sell), "SELL");
        assert_eq!(format!("{}", EventKind::QuoteUpdate), "QUOTE_UPDATE");
    }

    #[test]
    fn test_clock_is_monotonic() {
        let clock = CoreClock::new();
        let a = clock.now_ns();
        let b = clock.now_ns();
        assert!(b >= a);
    }
}
