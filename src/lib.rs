pub mod config;
pub mod models;
pub mod pipeline;
pub mod validator;

pub use models::{Biometrics, Decision, DecisionResult, ExtractedFields, ValidationRequest};
pub use pipeline::dosage::compute_dose;
pub use pipeline::evidence::{EvidenceStore, HttpEvidenceStore, InMemoryEvidenceStore};
pub use pipeline::prescription::extract_fields;
pub use pipeline::threshold::parse_threshold;
pub use validator::Validator;

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to the
/// build's default filter. Does nothing if the host already installed one.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} v{} logging initialised", config::APP_NAME, config::APP_VERSION);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }

    #[test]
    fn crate_surface_validates_end_to_end() {
        let mut store = InMemoryEvidenceStore::new();
        store.add(
            "data/prednisona.pdf",
            Some("1"),
            "Prednisone for JIA flares: maximum daily dose 60 mg.",
        );
        let validator = Validator::new(std::sync::Arc::new(store), config::EngineConfig::default());
        let result = validator.validate("Prednisone 20 mg daily", 30.0, "P-010");
        assert_eq!(result.decision, Decision::Approved);
        assert_eq!(result.frequency_hours, Some(24));
    }
}
