pub mod block;
pub mod document;
pub mod error;
pub mod locate;
pub mod substitute;

pub use block::{BlockSpan, BlockSpec, StartMarker};
pub use document::{Document, Payload};
pub use error::{InputKind, MarkerKind, SpliceError};
pub use locate::locate;
pub use substitute::{Substitutor, substitute};

/// Result alias for substitution operations.
pub type Result<T> = std::result::Result<T, SpliceError>;
