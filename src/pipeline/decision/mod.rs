pub mod engine;
pub mod rules;

pub use engine::decide;
pub use rules::{find_contraindication, ContraindicationMatch, CONTRAINDICATION_RULES};
