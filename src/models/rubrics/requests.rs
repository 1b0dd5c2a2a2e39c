use serde::Deserialize;
use ts_rs::TS;

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "rubric.ts")]
pub struct RubricItemInput {
    pub id: Option<i64>,
    pub header: String,
    #[serde(default)]
    pub description: String,
    pub points: f64,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "rubric.ts")]
pub struct RubricRowInput {
    pub id: Option<i64>,
    pub header: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub items: Vec<RubricItemInput>,
}

// PUT /assignments/:id/rubrics/
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "rubric.ts")]
pub struct PutRubricRequest {
    pub rows: Option<Vec<RubricRowInput>>,
    pub clear_selections: Option<bool>,
}

// PATCH /submissions/:id/rubricitems/
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "rubric.ts")]
pub struct SelectItemsRequest {
    pub items: Option<Vec<i64>>,
}
