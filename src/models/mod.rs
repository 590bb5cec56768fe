pub mod decision;
pub mod evidence;
pub mod prescription;

pub use decision::*;
pub use evidence::*;
pub use prescription::*;
