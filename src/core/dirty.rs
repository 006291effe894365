use std::{
    cmp::max,
    ops::{BitOr, BitOrAssign},
};

/// Cache validity of a dependent computation.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum Dirty {
    Clean,
    MaybeDirty,
    Dirty,
}
impl Dirty {
    pub fn from_is_dirty(is_dirty: bool) -> Self {
        if is_dirty {
            Dirty::Dirty
        } else {
            Dirty::Clean
        }
    }
    pub fn is_clean(self) -> bool {
        self == Dirty::Clean
    }

    /// Return true if the dependents need to be notified when this value is raised to `Dirty` or `MaybeDirty`.
    ///
    /// Equivalent to [`is_clean`](Self::is_clean): when changing from `MaybeDirty` to `Dirty`,
    /// no notification is necessary because one was already sent for the previous `MaybeDirty`.
    pub fn needs_notify(self) -> bool {
        self.is_clean()
    }
}

impl BitOr for Dirty {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        max(self, rhs)
    }
}
impl BitOrAssign for Dirty {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}
impl BitOr<NotifyLevel> for Dirty {
    type Output = Self;
    fn bitor(self, rhs: NotifyLevel) -> Self {
        max(self, rhs.into())
    }
}
impl BitOrAssign<NotifyLevel> for Dirty {
    fn bitor_assign(&mut self, rhs: NotifyLevel) {
        *self = *self | rhs;
    }
}

/// Strength of an invalidation notification.
///
/// Sources that can filter out no-op changes notify `MaybeDirty`;
/// dependents must check the source before trusting their cache.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum NotifyLevel {
    Dirty,
    MaybeDirty,
}
impl NotifyLevel {
    pub fn with_filter(self, filter: bool) -> Self {
        if filter {
            NotifyLevel::MaybeDirty
        } else {
            self
        }
    }
}

impl From<NotifyLevel> for Dirty {
    fn from(value: NotifyLevel) -> Self {
        match value {
            NotifyLevel::Dirty => Dirty::Dirty,
            NotifyLevel::MaybeDirty => Dirty::MaybeDirty,
        }
    }
}
