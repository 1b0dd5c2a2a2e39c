use super::entities::LinterCounts;
use serde::Serialize;
use std::collections::BTreeMap;
use ts_rs::TS;

// GET /assignments/:id/linters/ 中的一项
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "linter.ts")]
pub struct LinterListEntry {
    pub name: String,
    pub desc: String,
    pub opts: BTreeMap<String, String>,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub id: Option<String>,
}

// GET /linters/:id
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "linter.ts")]
pub struct LinterDetailResponse {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    #[ts(flatten)]
    pub counts: LinterCounts,
}
