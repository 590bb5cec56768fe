pub mod normalize;
pub mod prescription; // Drug, dose and frequency extraction
pub mod evidence; // Evidence stores + retrieval
pub mod threshold;
pub mod dosage;
pub mod decision;
pub mod report;
pub mod llm; // Optional model review
