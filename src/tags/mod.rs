pub mod merge;
pub mod template;

pub use merge::*;
pub use template::*;
