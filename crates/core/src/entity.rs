//! Entity trait: identity + continuity across state changes.

use crate::id::UserId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// An entity exclusively scoped to one user.
///
/// Stores use this to make records owned by another user indistinguishable
/// from records that do not exist.
pub trait Owned: Entity {
    fn owner(&self) -> UserId;

    fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner() == user_id
    }
}
