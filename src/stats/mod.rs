pub mod derive;
pub mod refresh;
pub mod source;
