use std::{cell::Ref, fmt::Debug, ops::Deref};

/// Abstracted shared reference to a signal value.
///
/// Wraps either a plain `&T` or a [`RefCell`](std::cell::RefCell) borrow so that
/// signal primitives with different storage can hand out references through one type.
pub struct ValueRef<'a, T: ?Sized>(RawValueRef<'a, T>);

enum RawValueRef<'a, T: ?Sized> {
    Plain(&'a T),
    Cell(Ref<'a, T>),
}

impl<'a, T: ?Sized> ValueRef<'a, T> {
    /// Project a `ValueRef<T>` to a `ValueRef<U>` referencing part of the value.
    pub fn map<U: ?Sized>(this: Self, f: impl FnOnce(&T) -> &U) -> ValueRef<'a, U> {
        ValueRef(match this.0 {
            RawValueRef::Plain(value) => RawValueRef::Plain(f(value)),
            RawValueRef::Cell(value) => RawValueRef::Cell(Ref::map(value, f)),
        })
    }

    pub fn into_owned(self) -> T::Owned
    where
        T: ToOwned,
    {
        self.deref().to_owned()
    }
}

impl<T: ?Sized> Deref for ValueRef<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        match &self.0 {
            RawValueRef::Plain(value) => value,
            RawValueRef::Cell(value) => value,
        }
    }
}
impl<'a, T: ?Sized> From<&'a T> for ValueRef<'a, T> {
    fn from(value: &'a T) -> Self {
        Self(RawValueRef::Plain(value))
    }
}
impl<'a, T: ?Sized> From<Ref<'a, T>> for ValueRef<'a, T> {
    fn from(value: Ref<'a, T>) -> Self {
        Self(RawValueRef::Cell(value))
    }
}
impl<T: ?Sized + Debug> Debug for ValueRef<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&**self, f)
    }
}
