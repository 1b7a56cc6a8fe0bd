pub mod clock;
mod lifecycle;
mod relay;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use lifecycle::{generate_code, PasscodeService};
pub use relay::{EmailMessage, EmailRelay, HttpEmailRelay};
pub use types::{Passcode, PasscodeSlot, Verification};
