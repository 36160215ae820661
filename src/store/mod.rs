pub mod readiness;
pub mod slot;
pub mod snapshot;
pub mod state;

pub use readiness::*;
pub use slot::*;
pub use snapshot::*;
pub use state::*;

