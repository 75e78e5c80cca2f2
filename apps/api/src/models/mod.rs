pub mod evaluation;
pub mod index;
pub mod source;
