use crate::core::event::CollisionEvent;

/// Receives resolved events.
///
/// Listeners run synchronously after an event is fully applied and the
/// schedule is consistent again, once per event, in event order. They see the
/// event record only and cannot touch particle state.
pub trait CollisionListener {
    fn collision_action(&mut self, event: &CollisionEvent);
}

impl<F> CollisionListener for F
where
    F: FnMut(&CollisionEvent),
{
    fn collision_action(&mut self, event: &CollisionEvent) {
        self(event)
    }
}

/// Handle returned by [`ListenerRegistry::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered set of listeners; notification follows registration order.
///
/// Listeners must be `Send` so an engine can be stepped off the calling thread.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    entries: Vec<(ListenerId, Box<dyn CollisionListener + Send>)>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.entries.len())
            .finish()
    }
}

impl ListenerRegistry {
    pub fn add(&mut self, listener: impl CollisionListener + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    /// Returns false if `id` was not registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(lid, _)| *lid != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn notify(&mut self, event: &CollisionEvent) {
        for (_, l) in &mut self.entries {
            l.collision_action(event);
        }
    }
}
