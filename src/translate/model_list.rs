//! Map backend model descriptors onto LM Studio's model descriptor shape.

use super::openai_types::BackendModel;
use super::studio_types::{StudioModel, StudioModelList};

/// Publisher reported when the backend does not say who owns a model.
pub const FALLBACK_PUBLISHER: &str = "litellm-proxied";

/// Context length advertised for every model. The backend does not report one.
pub const MAX_CONTEXT_LENGTH: u32 = 32_768;

/// Translate one backend model. `default_alias` stands in for a missing id.
#[must_use]
pub fn openai_model_to_studio(model: &BackendModel, default_alias: &str) -> StudioModel {
    StudioModel {
        id: model
            .id
            .clone()
            .unwrap_or_else(|| default_alias.to_string()),
        object: "model".to_string(),
        model_type: "chat".to_string(),
        publisher: model
            .owned_by
            .clone()
            .unwrap_or_else(|| FALLBACK_PUBLISHER.to_string()),
        arch: "unknown".to_string(),
        compatibility_type: "openai".to_string(),
        quantization: "unknown".to_string(),
        state: "loaded".to_string(),
        max_context_length: MAX_CONTEXT_LENGTH,
    }
}

#[must_use]
pub fn openai_models_to_studio(models: &[BackendModel], default_alias: &str) -> StudioModelList {
    StudioModelList::new(
        models
            .iter()
            .map(|m| openai_model_to_studio(m, default_alias))
            .collect(),
    )
}
