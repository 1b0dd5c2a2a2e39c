use serde::Deserialize;
use ts_rs::TS;

// GET /submissions/:id/files/
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "file.ts")]
pub struct FilesQuery {
    pub file_id: Option<i64>,
    pub path: Option<String>,
    pub is_directory: Option<bool>,
}

// GET /code/:file_id
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "file.ts")]
pub struct CodeQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

// GET /files/:name
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "file.ts")]
pub struct MirrorDownloadQuery {
    pub name: Option<String>,
}
