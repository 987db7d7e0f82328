//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod names;
pub mod search;
pub mod validation;

pub use names::{ItemName, TagName};
pub use search::SearchQuery;
pub use validation::ValidationError;
