pub mod entities;
pub mod errors;
pub mod flags;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use flags::*;
pub use value_objects::*;
