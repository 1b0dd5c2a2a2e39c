//! 按 id 读取对象，不存在时返回 OBJECT_ID_NOT_FOUND

use std::sync::Arc;

use crate::config::{AppConfig, Feature};
use crate::errors::{CGSystemError, Result};
use crate::models::assignments::entities::Assignment;
use crate::models::courses::entities::Course;
use crate::models::files::entities::FileNode;
use crate::models::submissions::entities::Work;
use crate::models::users::entities::User;
use crate::storage::Storage;

fn not_found(kind: &str, id: impl std::fmt::Display) -> CGSystemError {
    CGSystemError::object_id_not_found(format!("The requested \"{kind}\" was not found"))
        .with_description(format!("There is no \"{kind}\" with primary key {id}"))
}

pub async fn course(storage: &Arc<dyn Storage>, id: i64) -> Result<Course> {
    storage
        .get_course(id)
        .await?
        .ok_or_else(|| not_found("Course", id))
}

pub async fn assignment(storage: &Arc<dyn Storage>, id: i64) -> Result<Assignment> {
    storage
        .get_assignment(id)
        .await?
        .ok_or_else(|| not_found("Assignment", id))
}

pub async fn work(storage: &Arc<dyn Storage>, id: i64) -> Result<Work> {
    storage.get_work(id).await?.ok_or_else(|| not_found("Work", id))
}

pub async fn file(storage: &Arc<dyn Storage>, id: i64) -> Result<FileNode> {
    storage.get_file(id).await?.ok_or_else(|| not_found("File", id))
}

pub async fn user(storage: &Arc<dyn Storage>, id: i64) -> Result<User> {
    storage
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| not_found("User", id))
}

/// 功能关闭时返回 DISABLED_FEATURE
pub fn ensure_feature(feature: Feature) -> Result<()> {
    ensure_feature_in(AppConfig::get(), feature)
}

pub fn ensure_feature_in(config: &AppConfig, feature: Feature) -> Result<()> {
    if config.feature_enabled(feature) {
        Ok(())
    } else {
        Err(CGSystemError::disabled_feature("This feature is not enabled for this instance.")
            .with_description(format!("The feature \"{}\" is not enabled.", feature.name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_feature() {
        let mut config = AppConfig::default();
        assert!(ensure_feature_in(&config, Feature::Rubrics).is_ok());

        config.features.rubrics = false;
        let err = ensure_feature_in(&config, Feature::Rubrics).unwrap_err();
        assert_eq!(err.api_code(), "DISABLED_FEATURE");
        assert!(err.description().contains("RUBRICS"));
    }

    #[test]
    fn test_not_found_message() {
        let err = not_found("Work", 12);
        assert_eq!(err.api_code(), "OBJECT_ID_NOT_FOUND");
        assert_eq!(err.description(), "There is no \"Work\" with primary key 12");
    }
}
