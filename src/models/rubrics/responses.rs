use super::entities::{RubricItem, RubricRow};
use serde::Serialize;
use ts_rs::TS;

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "rubric.ts")]
pub struct RubricPoints {
    pub max: f64,
    pub selected: f64,
}

// GET /submissions/:id/rubrics/
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "rubric.ts")]
pub struct SubmissionRubricResponse {
    pub rubrics: Vec<RubricRow>,
    pub selected: Vec<RubricItem>,
    pub points: RubricPoints,
}
