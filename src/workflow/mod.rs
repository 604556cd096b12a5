mod machine;
mod session;

pub use machine::{Command, Outcome, Workflow};
pub use session::{AdminState, Session};
