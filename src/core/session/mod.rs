// Session module - Provisioning session state machine
pub mod operator;
pub mod session;
pub mod state;

pub use operator::{Operator, RecoveryChoice, ResetMethod, SessionEvent};
pub use session::{run_session, ProvisionReport, ProvisionSession};
pub use state::SessionState;
