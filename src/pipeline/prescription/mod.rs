pub mod drugs;
pub mod fields;
pub mod frequency;

pub use drugs::{lookup, match_known_drug, resolve_drug_name, search_variants, KnownDrug, KNOWN_DRUGS};
pub use fields::extract_fields;
pub use frequency::{parse_frequency, Frequency};
