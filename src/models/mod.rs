mod lease;
mod ledger;
mod payment;

pub use lease::*;
pub use ledger::*;
pub use payment::*;
