//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Principals, warehouses and shippers are all looked up by id by the
/// persistence adapters; this is the shared seam.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
