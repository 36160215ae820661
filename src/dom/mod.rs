pub mod document;
pub mod extractor;
pub mod selector;

pub use document::*;
pub use extractor::*;
pub use selector::*;
