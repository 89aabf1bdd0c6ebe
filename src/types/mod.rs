pub mod refset;
pub mod structure_definition;
pub mod tables;
pub mod terminology;

pub use refset::*;
pub use structure_definition::*;
pub use tables::*;
pub use terminology::*;
