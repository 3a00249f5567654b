//! Per-client refresh gate.
//!
//! Holds the failure budget as an explicit state machine:
//!
//! ```text
//!            AuthFailure                RefreshSettled
//!   ┌──────┐ ──────────► ┌────────────┐ ─────────────► ┌───────┐
//!   │ Idle │             │ Refreshing │                │ Spent │
//!   └──────┘ ◄────────── └────────────┘                └───────┘
//!      ▲        Reset                                      │
//!      └───────────────────── Success / Reset ─────────────┘
//! ```
//!
//! `Success` while `Refreshing` is accepted but keeps the state, so at most
//! one refresh is ever in flight per client.

use crate::error::IneligibleReason;
use parking_lot::Mutex;
use rust_fsm::*;
use tracing::debug;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub refresh_gate_machine(Idle)

    Idle => {
        AuthFailure => Refreshing,
        Success => Idle,
        Reset => Idle
    },
    Refreshing => {
        RefreshSettled => Spent,
        Success => Refreshing,
        Reset => Idle
    },
    Spent => {
        Success => Idle,
        Reset => Idle
    }
}

pub use refresh_gate_machine::Input as GateInput;
pub use refresh_gate_machine::State as GateMachineState;
pub use refresh_gate_machine::StateMachine as GateMachine;

/// Observable gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Budget 0.
    Idle,
    /// Budget 1, refresh in flight.
    Refreshing,
    /// Budget 1, refresh settled, no success since.
    Spent,
}

impl From<&GateMachineState> for GateState {
    fn from(state: &GateMachineState) -> Self {
        match state {
            GateMachineState::Idle => GateState::Idle,
            GateMachineState::Refreshing => GateState::Refreshing,
            GateMachineState::Spent => GateState::Spent,
        }
    }
}

struct GateInner {
    machine: GateMachine,
    /// Bumped on every reset so that tickets from before the reset are inert.
    generation: u64,
}

/// Single-slot refresh permit holder.
pub struct RefreshGate {
    inner: Mutex<GateInner>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GateInner {
                machine: GateMachine::new(),
                generation: 0,
            }),
        }
    }

    pub fn state(&self) -> GateState {
        GateState::from(self.inner.lock().machine.state())
    }

    /// Authorization failures counted since the last success: 0 or 1.
    pub fn failure_budget(&self) -> u8 {
        match self.state() {
            GateState::Idle => 0,
            GateState::Refreshing | GateState::Spent => 1,
        }
    }

    /// Take the budget. Only succeeds from `Idle`.
    pub fn try_acquire(&self) -> Result<RefreshTicket<'_>, IneligibleReason> {
        let mut inner = self.inner.lock();
        let before = GateState::from(inner.machine.state());
        if inner.machine.consume(&GateInput::AuthFailure).is_err() {
            return Err(match before {
                GateState::Refreshing => IneligibleReason::RefreshInFlight,
                GateState::Idle | GateState::Spent => IneligibleReason::BudgetSpent,
            });
        }
        debug!(old_state = ?before, new_state = ?GateState::Refreshing, "Refresh gate transition");
        Ok(RefreshTicket {
            gate: self,
            generation: inner.generation,
            settled: false,
        })
    }

    /// A 2xx response was observed.
    pub fn record_success(&self) {
        self.apply(&GateInput::Success);
    }

    /// Return to `Idle` and invalidate outstanding tickets.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.generation = inner.generation.wrapping_add(1);
        let before = GateState::from(inner.machine.state());
        let _ = inner.machine.consume(&GateInput::Reset);
        if before != GateState::Idle {
            debug!(old_state = ?before, new_state = ?GateState::Idle, "Refresh gate transition");
        }
    }

    fn settle(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!("Ignoring refresh settlement from before a reset");
            return;
        }
        let before = GateState::from(inner.machine.state());
        if inner.machine.consume(&GateInput::RefreshSettled).is_ok() {
            debug!(old_state = ?before, new_state = ?GateState::Spent, "Refresh gate transition");
        }
    }

    fn apply(&self, input: &GateInput) {
        let mut inner = self.inner.lock();
        let before = GateState::from(inner.machine.state());
        if inner.machine.consume(input).is_err() {
            return;
        }
        let after = GateState::from(inner.machine.state());
        if before != after {
            debug!(old_state = ?before, new_state = ?after, "Refresh gate transition");
        }
    }
}

impl Default for RefreshGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Permit to run the one refresh. Settles the gate when dropped, so an
/// abandoned refresh never leaves the gate `Refreshing`.
pub struct RefreshTicket<'a> {
    gate: &'a RefreshGate,
    generation: u64,
    settled: bool,
}

impl RefreshTicket<'_> {
    /// Mark the refresh as finished, successful or not.
    pub fn settle(mut self) {
        self.settled = true;
        self.gate.settle(self.generation);
    }
}

impl Drop for RefreshTicket<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.gate.settle(self.generation);
        }
    }
}
