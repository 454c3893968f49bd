use std::sync::Arc;
use parking_lot::Mutex;
use ahash::AHashMap;

/// Event bus connecting the trellis state to its presentation layer
pub struct EventBus {
    handlers: Arc<Mutex<AHashMap<std::any::TypeId, Vec<Box<dyn EventHandler>>>>>,
}

/// Event trait that all events must implement
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Handler trait for event handlers
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Events published by the trellis state
pub mod events {
    use super::Event;
    use crate::domain::Domain;

    /// Rows were (re)loaded and grouped
    #[derive(Debug, Clone)]
    pub struct DatasetLoaded {
        pub row_count: usize,
        pub facet_count: usize,
    }

    /// A layout was produced
    #[derive(Debug, Clone)]
    pub struct LayoutComputed {
        pub visible: usize,
        pub total: usize,
        pub domain: Option<Domain>,
    }

    /// A chart was clicked; carries the facet label and its subset
    #[derive(Debug, Clone)]
    pub struct FacetClicked<T> {
        pub label: String,
        pub rows: Vec<T>,
    }

    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(DatasetLoaded, LayoutComputed);

    impl<T: Send + Sync + 'static> Event for FacetClicked<T> {
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(AHashMap::new())),
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();
        handlers.entry(type_id).or_default().push(handler);
    }

    /// Subscribe with a closure that only sees events of type `E`
    pub fn on<E, F>(&self, mut f: F)
    where
        E: Event,
        F: FnMut(&E) + Send + Sync + 'static,
    {
        self.subscribe::<E>(handler_from_fn(move |event| {
            if let Some(event) = event.as_any().downcast_ref::<E>() {
                f(event);
            }
        }));
    }

    /// Publish an event.
    ///
    /// Handlers run without the bus lock held, so they may subscribe, publish
    /// other event types or read the state that owns the bus. A nested publish
    /// of `E` from inside an `E` handler reaches no handlers.
    pub fn publish<E: Event>(&self, event: E) {
        let type_id = std::any::TypeId::of::<E>();
        let Some(mut dispatching) = self.handlers.lock().remove(&type_id) else {
            return;
        };

        for handler in dispatching.iter_mut() {
            handler.handle(&event);
        }

        let mut handlers = self.handlers.lock();
        // Subscribed during dispatch: keep them after the existing handlers
        if let Some(added) = handlers.remove(&type_id) {
            dispatching.extend(added);
        }
        handlers.insert(type_id, dispatching);
    }

    /// Number of handlers registered for `E`
    pub fn handler_count<E: Event>(&self) -> usize {
        self.handlers
            .lock()
            .get(&std::any::TypeId::of::<E>())
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.handler)(event);
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}
