pub mod dispatcher;
pub mod outcome;

pub use dispatcher::{Dispatcher, EndpointTarget};
pub use outcome::{DispatchOutcome, DispatchSummary};
