//! Lifecycle notifications.

use std::fmt;

/// Lifecycle points that listeners hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GazetteerEvent {
    /// The dictionary was rebuilt from its definition.
    Reinit { lists: usize, entries: usize },
}

/// Handle returned by `add_listener`, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Box<dyn FnMut(&GazetteerEvent) + Send>;

/// Callbacks notified synchronously, in registration order.
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    callbacks: Vec<(ListenerId, Callback)>,
}

impl Listeners {
    pub fn add(&mut self, callback: impl FnMut(&GazetteerEvent) + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(existing, _)| *existing != id);
        self.callbacks.len() != before
    }

    pub fn notify(&mut self, event: &GazetteerEvent) {
        for (_, callback) in &mut self.callbacks {
            callback(event);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.callbacks.len())
            .finish()
    }
}
