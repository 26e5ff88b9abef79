// File: testing-framework/src/orchestrator/overrides.rs
//
// Overlapping scoped overrides of one process-wide value
//
// Harnesses on different test threads may be alive at the same time and be
// torn down in any order. Each registers its override here. The global
// holds the value resolved from every live override, and the value seen
// before the first override is written back once the last one is released.

use parking_lot::Mutex;

/// Handle of one registered override
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverrideId(u64);

/// Registry of live overrides for a single global
pub struct OverrideRegistry<T: Copy> {
    read: fn() -> T,
    write: fn(T),
    resolve: fn(&[T]) -> T,
    state: Mutex<RegistryState<T>>,
}

struct RegistryState<T> {
    baseline: Option<T>,
    next_id: u64,
    active: Vec<(OverrideId, T)>,
}

/// Resolver picking the most recently registered override
pub fn newest<T: Copy>(values: &[T]) -> T {
    values[values.len() - 1]
}

impl<T: Copy> OverrideRegistry<T> {
    /// `resolve` is only called with a non-empty slice, oldest first
    pub fn new(read: fn() -> T, write: fn(T), resolve: fn(&[T]) -> T) -> Self {
        Self {
            read,
            write,
            resolve,
            state: Mutex::new(RegistryState {
                baseline: None,
                next_id: 0,
                active: Vec::new(),
            }),
        }
    }

    pub fn register(&self, value: T) -> OverrideId {
        let mut state = self.state.lock();
        if state.active.is_empty() {
            state.baseline = Some((self.read)());
        }
        let id = OverrideId(state.next_id);
        state.next_id += 1;
        state.active.push((id, value));
        self.apply(&state);
        id
    }

    /// Unknown or already released ids are ignored
    pub fn release(&self, id: OverrideId) {
        let mut state = self.state.lock();
        let before = state.active.len();
        state.active.retain(|(active, _)| *active != id);
        if state.active.len() == before {
            return;
        }
        if state.active.is_empty() {
            if let Some(baseline) = state.baseline.take() {
                (self.write)(baseline);
            }
        } else {
            self.apply(&state);
        }
    }

    /// Value in effect before any live override
    pub fn baseline(&self) -> T {
        let state = self.state.lock();
        state.baseline.unwrap_or_else(|| (self.read)())
    }

    pub fn live(&self) -> usize {
        self.state.lock().active.len()
    }

    fn apply(&self, state: &RegistryState<T>) {
        let values: Vec<T> = state.active.iter().map(|(_, value)| *value).collect();
        (self.write)((self.resolve)(&values));
    }
}
