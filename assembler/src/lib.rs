pub mod error;
pub mod executor;
pub mod recipe;

pub use error::AssembleError;
pub use executor::{Assembly, BlockReport, Inputs};
pub use recipe::{BlockEntry, Recipe};
