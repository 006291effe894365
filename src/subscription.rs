use std::{any::Any, mem::take, rc::Rc};

#[cfg(test)]
mod tests;

/// RAII handle for an active observer.
///
/// Dropping the subscription detaches whatever it keeps alive.
#[derive(Default)]
#[must_use]
pub struct Subscription(RawSubscription);

impl Subscription {
    pub fn empty() -> Self {
        Subscription(RawSubscription::Empty)
    }
    pub fn from_fn(f: impl FnOnce() + 'static) -> Self {
        Subscription(RawSubscription::Fn(Box::new(f)))
    }
    pub fn from_rc(rc: Rc<dyn Any>) -> Self {
        Subscription(RawSubscription::Rc(rc))
    }
}
impl Drop for Subscription {
    fn drop(&mut self) {
        match take(&mut self.0) {
            RawSubscription::Empty => {}
            RawSubscription::Fn(f) => f(),
            RawSubscription::Rc(_) => {}
        }
    }
}

#[derive(Default)]
enum RawSubscription {
    #[default]
    Empty,
    Fn(Box<dyn FnOnce() + 'static>),
    Rc(#[allow(unused)] Rc<dyn Any>),
}
