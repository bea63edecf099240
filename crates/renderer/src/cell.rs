//! Single-threaded observable value holder.
//!
//! A [`ReactiveCell`] keeps only its latest value. Subscribers are invoked
//! synchronously, in subscription order, on every [`ReactiveCell::set`]. The
//! [`Subscription`] returned by [`ReactiveCell::subscribe`] unregisters its
//! callback when cancelled or dropped; a callback cancelled while a
//! notification is in flight is skipped for the remainder of that round.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

type Callback<T> = Rc<RefCell<dyn FnMut(&T)>>;

struct Registry<T> {
    value: Option<T>,
    generation: u64,
    next_id: u64,
    subscribers: BTreeMap<u64, Callback<T>>,
}

pub struct ReactiveCell<T> {
    inner: Rc<RefCell<Registry<T>>>,
}

impl<T: Clone + 'static> ReactiveCell<T> {
    /// Creates a cell holding `value`.
    pub fn new(value: T) -> Self {
        Self::with_value(Some(value))
    }

    /// Creates a cell with no value; subscribers are not called until the first `set`.
    pub fn empty() -> Self {
        Self::with_value(None)
    }

    fn with_value(value: Option<T>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry {
                value,
                generation: 0,
                next_id: 0,
                subscribers: BTreeMap::new(),
            })),
        }
    }

    pub fn get(&self) -> Option<T> {
        self.inner.borrow().value.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Stores `value` and notifies subscribers. A nested `set` from inside a
    /// callback supersedes this round; the remaining subscribers only see the
    /// newer value.
    pub fn set(&self, value: T) {
        let (generation, targets): (u64, Vec<(u64, Callback<T>)>) = {
            let mut registry = self.inner.borrow_mut();
            registry.value = Some(value.clone());
            registry.generation += 1;
            let targets = registry
                .subscribers
                .iter()
                .map(|(id, callback)| (*id, Rc::clone(callback)))
                .collect();
            (registry.generation, targets)
        };

        for (id, callback) in targets {
            {
                let registry = self.inner.borrow();
                if registry.generation != generation {
                    tracing::trace!("cell value replaced during notification; stopping stale round");
                    break;
                }
                if !registry.subscribers.contains_key(&id) {
                    continue;
                }
            }
            deliver(&callback, &value);
        }
    }

    #[must_use = "dropping a Subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&T) + 'static,
    {
        let callback: Callback<T> = Rc::new(RefCell::new(callback));
        let (id, current) = {
            let mut registry = self.inner.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.subscribers.insert(id, Rc::clone(&callback));
            (id, registry.value.clone())
        };

        let weak: Weak<RefCell<Registry<T>>> = Rc::downgrade(&self.inner);
        let subscription = Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().subscribers.remove(&id);
                }
            })),
        };

        if let Some(value) = current {
            deliver(&callback, &value);
        }
        subscription
    }
}

impl<T> Clone for ReactiveCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

fn deliver<T>(callback: &Callback<T>, value: &T) {
    // A callback that sets its own cell would re-enter itself; skip the nested call.
    match callback.try_borrow_mut() {
        Ok(mut callback) => (&mut *callback)(value),
        Err(_) => tracing::trace!("skipping re-entrant subscriber delivery"),
    }
}

/// Handle that keeps a subscriber registered.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn subscribe_delivers_current_value_immediately() {
        let cell = ReactiveCell::new(3);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = cell.subscribe(move |value| sink.borrow_mut().push(*value));
        assert_eq!(*seen.borrow(), vec![3]);
    }

    #[test]
    fn empty_cell_waits_for_first_set() {
        let cell = ReactiveCell::<i32>::empty();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = cell.subscribe(move |value| sink.borrow_mut().push(*value));
        assert!(seen.borrow().is_empty());
        cell.set(7);
        assert_eq!(*seen.borrow(), vec![7]);
        assert_eq!(cell.get(), Some(7));
    }

    #[test]
    fn subscribers_are_notified_in_subscription_order() {
        let cell = ReactiveCell::<u8>::empty();
        let order = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&order);
        let second = Rc::clone(&order);
        let _a = cell.subscribe(move |_| first.borrow_mut().push("a"));
        let _b = cell.subscribe(move |_| second.borrow_mut().push("b"));
        cell.set(1);
        cell.set(2);
        assert_eq!(*order.borrow(), vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn cancelled_subscription_receives_nothing() {
        let cell = ReactiveCell::new(0);
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let sub = cell.subscribe(move |_| counter.set(counter.get() + 1));
        assert_eq!(calls.get(), 1);
        sub.cancel();
        cell.set(1);
        cell.set(2);
        assert_eq!(calls.get(), 1);
        assert_eq!(cell.subscriber_count(), 0);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let cell = ReactiveCell::<u8>::empty();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        drop(cell.subscribe(move |_| counter.set(counter.get() + 1)));
        cell.set(1);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn subscriber_cancelled_mid_notification_is_skipped() {
        let cell = ReactiveCell::<u8>::empty();
        let victim_slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let victim_calls = Rc::new(Cell::new(0));

        let slot = Rc::clone(&victim_slot);
        let _killer = cell.subscribe(move |_| {
            if let Some(sub) = slot.borrow_mut().take() {
                sub.cancel();
            }
        });
        let counter = Rc::clone(&victim_calls);
        *victim_slot.borrow_mut() = Some(cell.subscribe(move |_| counter.set(counter.get() + 1)));

        cell.set(1);
        cell.set(2);
        assert_eq!(victim_calls.get(), 0);
    }

    #[test]
    fn nested_set_supersedes_outer_round() {
        let cell = ReactiveCell::<u32>::empty();
        let writer = cell.clone();
        let _bump = cell.subscribe(move |value| {
            if *value == 1 {
                writer.set(2);
            }
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _observer = cell.subscribe(move |value| sink.borrow_mut().push(*value));

        cell.set(1);

        assert_eq!(*seen.borrow(), vec![2]);
        assert_eq!(cell.get(), Some(2));
        assert_eq!(seen.borrow().last().copied(), cell.get());
    }

    #[test]
    fn only_latest_value_is_retained() {
        let cell = ReactiveCell::new("a".to_string());
        cell.set("b".to_string());
        cell.set("c".to_string());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = cell.subscribe(move |value: &String| sink.borrow_mut().push(value.clone()));
        assert_eq!(*seen.borrow(), vec!["c".to_string()]);
    }
}
