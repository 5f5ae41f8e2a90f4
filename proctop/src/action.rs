//! Typed actions emitted by user controls and consumed by the state layer.

use crate::filter::FilterUpdate;
use crate::state::Tab;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SelectMachine(String),
    SetTab(Tab),
    UpdateFilter(FilterUpdate),
    ClearFilters,
    SetAutoRefresh { enabled: bool, interval_ms: u64 },
    SetMachineSearch(String),
    ToggleNode(u32),
    RefreshNow,
    Quit,
}

/// What the owner of the state must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    Render,
    /// Auto-refresh settings changed: cancel the pending timer and maybe re-arm.
    Reschedule,
    /// Start a fetch now; state is unchanged.
    Refresh,
    Quit,
}
