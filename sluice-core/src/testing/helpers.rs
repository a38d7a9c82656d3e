//! Test helper utilities for creating test data and assertions
//!
//! Provides convenient builders and utilities for:
//! - EventFields creation
//! - A collecting event handler

use crate::core::{fixed_point, EventFields, EventKind, EventRecord, Side};
use crate::engine::EventHandler;

/// Default instrument used by test events
pub const TEST_INSTRUMENT: u32 = 1;

/// Builder for `EventFields`, defaulting to a BUY new order at 100.0
#[derive(Debug, Clone, Copy)]
pub struct FieldsBuilder {
    fields: EventFields,
}

impl FieldsBuilder {
    pub fn new() -> Self {
        Self {
            fields: EventFields {
                kind: EventKind::NewOrder,
                instrument: TEST_INSTRUMENT,
                price: 100 * fixed_point::SCALE,
                quantity: 1,
                side: Side::Buy,
                ingest_ts_ns: 0,
            },
        }
    }

    pub fn kind(mut self, kind: EventKind) -> Self {
        self.fields.kind = kind;
        self
    }

    pub fn instrument(mut self, instrument: u32) -> Self {
        self.fields.instrument = instrument;
        self
    }

    /// Price in fixed-point units
    pub fn price(mut self, price: i64) -> Self {
        self.fields.price = price;
        self
    }

    pub fn quantity(mut self, quantity: u64) -> Self {
        self.fields.quantity = quantity;
        self
    }

    pub fn side(mut self, side: Side) -> Self {
        self.fields.side = side;
        self
    }

    pub fn ingest_ts_ns(mut self, ts: u64) -> Self {
        self.fields.ingest_ts_ns = ts;
        self
    }

    pub fn build(self) -> EventFields {
        self.fields
    }
}

impl Default for FieldsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A new-order event with the given quantity
pub fn order_fields(quantity: u64) -> EventFields {
    FieldsBuilder::new().quantity(quantity).build()
}

/// Event handler that keeps a copy of every record it sees
#[derive(Debug, Default, Clone)]
pub struct Collector {
    pub records: Vec<EventRecord>,
}

impl Collector {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn sequences(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.sequence).collect()
    }

    pub fn quantities(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.quantity).collect()
    }

    pub fn fields(&self) -> Vec<EventFields> {
        self.records.iter().map(EventRecord::fields).collect()
    }
}

impl EventHandler for Collector {
    fn on_event(&mut self, record: &EventRecord) {
        self.records.push(*record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let fields = FieldsBuilder::new().build();
        assert_eq!(fields.kind, EventKind::NewOrder);
        assert_eq!(fields.side, Side::Buy);
        assert_eq!(fields.price, 100_000_000_000);
    }

    #[test]
    fn test_builder_overrides() {
        let fields = FieldsBuilder::new()
            .kind(EventKind::Trade)
            .side(Side::Sell)
            .instrument(7)
            .price(-5)
            .quantity(42)
            .ingest_ts_ns(99)
            .build();

        assert_eq!(fields.kind, EventKind::Trade);
        assert_eq!(fields.side, Side::Sell);
        assert_eq!(fields.instrument, 7);
        assert_eq!(fields.price, -5);
        assert_eq!(fields.quantity, 42);
        assert_eq!(fields.ingest_ts_ns, 99);
    }

    #[test]
    fn test_collector() {
        let mut collector = Collector::with_capacity(2);
        let mut record = EventRecord::empty();
        record.fill(3, &order_fields(30), 0);
        collector.on_event(&record);

        assert_eq!(collector.len(), 1);
        assert_eq!(collector.sequences(), vec![3]);
        assert_eq!(collector.quantities(), vec![30]);
        assert_eq!(collector.fields(), vec![order_fields(30)]);
    }
}
