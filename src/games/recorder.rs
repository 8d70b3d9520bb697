/// Append-only buffer of raw interaction events for one game's active window.
///
/// The recorder does no validation and no scoring. Callers freeze a result by
/// draining it when the owning game completes.
#[derive(Debug, Clone)]
pub struct EventRecorder<E> {
    events: Vec<E>,
}

impl<E> Default for EventRecorder<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E> EventRecorder<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: E) {
        self.events.push(event);
    }

    /// Take every event recorded so far, leaving the recorder empty.
    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.events.iter()
    }
}
