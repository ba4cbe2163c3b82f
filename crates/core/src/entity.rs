//! Entity trait: identity that survives state changes.

/// Entity marker + minimal interface.
///
/// Orders and inventory records are entities; prices and bands are values.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
