use crate::store::keys;
use serde::{Deserialize, Serialize};

/// A stored passcode. `expires` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passcode {
    pub code: String,
    #[serde(rename = "expires")]
    pub expires_at: u64,
}

impl Passcode {
    /// Exact, case-sensitive match strictly before expiry.
    pub fn accepts(&self, entered: &str, now_millis: u64) -> bool {
        self.code == entered && now_millis < self.expires_at
    }
}

/// Where a passcode is kept. The live slot unlocks changes to an active block
/// list; the test slot exists so setup can confirm delivery works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasscodeSlot {
    Live,
    Test,
}

impl PasscodeSlot {
    pub const ALL: [PasscodeSlot; 2] = [PasscodeSlot::Live, PasscodeSlot::Test];

    pub fn storage_key(self) -> &'static str {
        match self {
            PasscodeSlot::Live => keys::CURRENT_PASSCODE,
            PasscodeSlot::Test => keys::TEST_PASSCODE,
        }
    }
}

/// Outcome of checking an entered code against both slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Valid(PasscodeSlot),
    /// The code matched a slot whose passcode has expired.
    Expired,
    Mismatched,
    NoneIssued,
}

impl Verification {
    pub fn is_valid(self) -> bool {
        matches!(self, Verification::Valid(_))
    }
}
