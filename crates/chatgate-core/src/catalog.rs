use time::OffsetDateTime;

use chatgate_protocol::openai::get_model::types::{Model, ModelObjectType};
use chatgate_protocol::openai::list_models::response::{ListObjectType, ListModelsResponse};

use crate::error::ApiError;

const OWNED_BY: &str = "chatgate";

/// Static in-process model catalog. A real deployment would derive this from
/// the backend; the lookup shape is what clients depend on.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<Model>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let model = |id: &str, age_secs: i64| Model {
            id: id.to_string(),
            object: ModelObjectType::Model,
            created: now - age_secs,
            owned_by: OWNED_BY.to_string(),
        };
        Self {
            models: vec![
                model("chatgate-standard", 10_000),
                model("chatgate-advanced", 20_000),
                model("chatgate-experimental", 5_000),
            ],
        }
    }

    pub fn list(&self) -> ListModelsResponse {
        ListModelsResponse {
            object: ListObjectType::List,
            data: self.models.clone(),
        }
    }

    pub fn get(&self, id: &str) -> Result<Model, ApiError> {
        self.models
            .iter()
            .find(|model| model.id == id)
            .cloned()
            .ok_or_else(|| ApiError::ModelNotFound {
                model: id.to_string(),
            })
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new()
    }
}
