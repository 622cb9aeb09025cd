pub mod captured_query;
pub mod directory;
pub mod entry;
pub mod settings;
pub mod value;

pub use captured_query::*;
pub use directory::*;
pub use entry::*;
pub use settings::*;
pub use value::*;
