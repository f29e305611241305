use serde::{Deserialize, Serialize};

/// Counting state for one identity.
///
/// `Uncounted` is the only non-terminal state: once an identity has been
/// counted as an entry or an exit it never contributes to the totals again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountState {
    /// Not yet counted
    #[default]
    Uncounted,
    /// Counted moving down across the midline
    CountedEntry,
    /// Counted moving up across the midline
    CountedExit,
}

impl CountState {
    pub fn is_counted(self) -> bool {
        self != CountState::Uncounted
    }
}
