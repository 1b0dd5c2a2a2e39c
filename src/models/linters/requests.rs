use serde::Deserialize;
use ts_rs::TS;

// POST /assignments/:id/linter
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "linter.ts")]
pub struct CreateLinterRequest {
    pub name: Option<String>,
    pub cfg: Option<String>,
}
