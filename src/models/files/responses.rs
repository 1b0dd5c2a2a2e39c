use serde::Serialize;
use ts_rs::TS;

// 目录列表，叶子没有 entries
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "file.ts")]
pub struct FileListing {
    pub name: String,
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub entries: Option<Vec<FileListing>>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "file.ts")]
pub struct FileMetadataResponse {
    pub name: String,
    pub extension: Option<String>,
    pub is_directory: bool,
}
