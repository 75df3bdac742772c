use chrono::{DateTime, Utc};

/// A domain event: an immutable fact about a circle, membership or product.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable dotted event type (e.g. "registry.circle.created").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred.
    fn occurred_at(&self) -> DateTime<Utc>;
}
