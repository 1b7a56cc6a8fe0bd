mod memory;
mod notify;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use notify::ChangeNotifier;
pub use sqlite::SqliteStore;
pub use traits::{ChangeSet, KeyValueStore, StoreMap, ValueChange};

/// Storage keys shared by every surface.
pub mod keys {
    pub const POPULAR_SITES: &str = "blocked";
    pub const CUSTOM_SITES: &str = "customBlocked";
    pub const BLOCKING_ACTIVE: &str = "blockingActive";
    pub const PROTECTION_EMAIL: &str = "protectionEmail";
    pub const RELAY_CONFIG: &str = "relayConfig";
    pub const CURRENT_PASSCODE: &str = "currentPasscode";
    pub const TEST_PASSCODE: &str = "testPasscode";

    /// Keys whose change means the installed rules may be stale.
    pub const BLOCKING_KEYS: [&str; 3] = [POPULAR_SITES, CUSTOM_SITES, BLOCKING_ACTIVE];

    /// Keys whose change can flip whether passcode protection is enabled.
    pub const PROTECTION_KEYS: [&str; 2] = [PROTECTION_EMAIL, RELAY_CONFIG];
}
