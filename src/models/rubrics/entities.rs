use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "rubric.ts")]
pub struct RubricItem {
    pub id: i64,
    #[serde(skip_serializing)]
    #[ts(skip)]
    pub row_id: i64,
    pub header: String,
    pub description: String,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "rubric.ts")]
pub struct RubricRow {
    pub id: i64,
    #[serde(skip_serializing)]
    #[ts(skip)]
    pub assignment_id: i64,
    pub header: String,
    pub description: String,
    pub items: Vec<RubricItem>,
}

/// 替换评分标准时的写入计划
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RubricPlan {
    pub rows: Vec<PlannedRow>,
    pub delete_rows: Vec<i64>,
    pub delete_items: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRow {
    pub id: Option<i64>,
    pub header: String,
    pub description: String,
    pub items: Vec<PlannedItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedItem {
    pub id: Option<i64>,
    pub header: String,
    pub description: String,
    pub points: f64,
}
