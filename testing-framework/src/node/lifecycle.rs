// File: testing-framework/src/node/lifecycle.rs
//
// Shared init/start/stop state machine for node components.

use parking_lot::RwLock;
use thiserror::Error;

/// Lifecycle state of a node component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    /// Constructed, nothing allocated yet
    Created,
    /// `init()` succeeded
    Initialized,
    /// `start()` succeeded
    Running,
    /// `stop()` succeeded, terminal
    Stopped,
}

/// Invalid lifecycle transition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{component}: cannot {action} while {state:?}")]
pub struct LifecycleError {
    /// Component name
    pub component: &'static str,
    /// Attempted transition
    pub action: &'static str,
    /// State the component was in
    pub state: ComponentState,
}

/// Guarded lifecycle state.
pub struct Lifecycle {
    component: &'static str,
    state: RwLock<ComponentState>,
}

impl Lifecycle {
    /// Create a lifecycle in the `Created` state
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            state: RwLock::new(ComponentState::Created),
        }
    }

    /// Current state
    pub fn state(&self) -> ComponentState {
        *self.state.read()
    }

    /// `Created -> Initialized`
    pub fn init(&self) -> Result<(), LifecycleError> {
        self.transition("init", &[ComponentState::Created], ComponentState::Initialized)
    }

    /// `Initialized -> Running`
    pub fn start(&self) -> Result<(), LifecycleError> {
        self.transition("start", &[ComponentState::Initialized], ComponentState::Running)
    }

    /// `Initialized | Running -> Stopped`
    pub fn stop(&self) -> Result<(), LifecycleError> {
        self.transition(
            "stop",
            &[ComponentState::Initialized, ComponentState::Running],
            ComponentState::Stopped,
        )
    }

    fn transition(
        &self,
        action: &'static str,
        from: &[ComponentState],
        to: ComponentState,
    ) -> Result<(), LifecycleError> {
        let mut state = self.state.write();
        if !from.contains(&*state) {
            return Err(LifecycleError {
                component: self.component,
                action,
                state: *state,
            });
        }
        *state = to;
        Ok(())
    }
}
