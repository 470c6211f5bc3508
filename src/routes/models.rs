//! Models endpoint
//!
//! Lists the model aliases the proxy accepts.

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::aliases;

/// Model information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

/// Models list response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<Model>,
}

/// List every alias in table order.
///
/// Aliases carry no release date, so `created` is the time of the request.
pub async fn list_models() -> Json<ModelsResponse> {
    let created = chrono::Utc::now().timestamp();

    let data = aliases::all()
        .iter()
        .map(|alias| Model {
            id: alias.id.to_string(),
            object: "model".to_string(),
            created,
            owned_by: alias.provider.to_string(),
        })
        .collect();

    Json(ModelsResponse {
        object: "list".to_string(),
        data,
    })
}
