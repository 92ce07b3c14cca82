//! Bookkeeping of registered and deregistered views
//!
//! Guarded by a single lock inside the main loop. A view is either registered, pending
//! unload, or unknown; every transition between these states happens under that lock.

use crate::view::View;
use std::sync::{Arc, Weak};

#[derive(Default)]
pub(crate) struct ViewRegistry {
    /// Weak: the main loop never keeps a view alive on its own
    registered: Vec<Weak<dyn View>>,
    /// Deregistered views waiting for their resources to be unloaded
    unregistered: Vec<Arc<dyn View>>,
}

fn is_same(weak: &Weak<dyn View>, view: &Arc<dyn View>) -> bool {
    std::ptr::addr_eq(weak.as_ptr(), Arc::as_ptr(view))
}

impl ViewRegistry {
    /// Returns false if the view was already registered
    pub fn register(&mut self, view: &Arc<dyn View>) -> bool {
        if self.registered.iter().any(|weak| is_same(weak, view)) {
            return false;
        }

        // Re-registered before its unload ran: nothing to unload anymore
        self.unregistered
            .retain(|pending| !std::ptr::addr_eq(Arc::as_ptr(pending), Arc::as_ptr(view)));
        self.registered.push(Arc::downgrade(view));
        true
    }

    /// Move the view to the pending-unload set. Returns false if it already was there.
    pub fn deregister(&mut self, view: &Arc<dyn View>) -> bool {
        self.registered.retain(|weak| !is_same(weak, view));

        let pending = self
            .unregistered
            .iter()
            .any(|pending| std::ptr::addr_eq(Arc::as_ptr(pending), Arc::as_ptr(view)));
        if pending {
            return false;
        }

        self.unregistered.push(Arc::clone(view));
        true
    }

    /// Strong copies of all live registered views, in registration order.
    ///
    /// Registrations of views dropped by their owner are pruned here.
    pub fn snapshot(&mut self) -> Vec<Arc<dyn View>> {
        let before = self.registered.len();
        self.registered.retain(|weak| weak.strong_count() > 0);

        let pruned = before - self.registered.len();
        if pruned > 0 {
            log::debug!("Pruned {} dropped view(s) from the main loop", pruned);
        }

        self.registered.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn take_unregistered(&mut self) -> Vec<Arc<dyn View>> {
        std::mem::take(&mut self.unregistered)
    }

    pub fn has_unregistered(&self) -> bool {
        !self.unregistered.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.registered
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn pending_count(&self) -> usize {
        self.unregistered.len()
    }

    #[cfg(test)]
    pub fn contains(&self, view: &Arc<dyn View>) -> bool {
        self.registered.iter().any(|weak| is_same(weak, view))
    }
}
