//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity** of their own; they are defined entirely
//! by what they carry. Two value objects holding the same values are the same
//! thing.

/// Marker trait for value objects.
///
/// ## Value Object vs Entity
///
/// - An order line `{ order_id: "o1", sku: "LAMP", qty: 10 }` is a value
///   object: a second line with the same three values *is* the same demand,
///   which is why allocating it twice is a no-op rather than a double booking.
/// - A `Batch` is an entity: its allocations change over time while its
///   reference stays fixed.
///
/// ## Immutability
///
/// Value objects never mutate. "Changing" one means constructing a new value,
/// which keeps them safe to copy between aggregates, hash into sets, and
/// compare in tests without aliasing surprises.
///
/// ## Design Constraints
///
/// The trait requires:
/// - **Clone**: values move between aggregates and events by copying
/// - **PartialEq**: comparison is attribute-by-attribute
/// - **Debug**: values appear in logs and assertion output
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
