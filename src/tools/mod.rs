pub mod documents;
pub mod rebuild;
pub mod search;

pub use documents::*;
pub use rebuild::*;
pub use search::*;
