use serde::Deserialize;

/// Body of `POST /api/todos` and `PUT /api/todos/:id`.
#[derive(Debug, Deserialize)]
pub struct TodoRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
}
