pub mod address;
pub mod definition;
pub mod matcher;
pub mod pattern;

pub use address::*;
pub use definition::*;
pub use matcher::*;
pub use pattern::*;
