pub mod inserts;
pub mod loading;

pub use inserts::*;
pub use loading::*;
