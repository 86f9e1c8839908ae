//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value** - two instances
/// with the same attribute values are the same value. To "modify" one, create
/// a new one. `Money` and `ValidityWindow` are value objects; a `PriceList`
/// (same ID, changing state) is an entity.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
