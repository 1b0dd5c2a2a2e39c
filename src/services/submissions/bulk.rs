//! Blackboard 成绩册导入
//!
//! 每个学生号对应一个用户，不存在时以 Student 课程角色创建；
//! 导入后如果作业已经分配过评分员，重新分配一次。

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use super::SubmissionService;
use crate::config::{AppConfig, Feature};
use crate::errors::{CGSystemError, Result};
use crate::models::assignments::entities::Assignment;
use crate::models::files::entities::FileTree;
use crate::models::permissions::entities::Perm;
use crate::models::submissions::entities::NewWork;
use crate::models::submissions::responses::BulkUploadResponse;
use crate::models::users::entities::{NewUser, User};
use crate::runtime::Background;
use crate::services::assignments::{notify_reset, pick_grader, redivide};
use crate::services::ingest::blackboard::{SubmissionInfo, process_blackboard_zip};
use crate::services::ingest::blobs::remove_blobs;
use crate::services::ingest::multipart::save_files;
use crate::services::lookup::{self, ensure_feature};
use crate::services::permissions::load_checker;
use crate::storage::Storage;
use crate::utils::run_blocking;

const STUDENT_ROLE: &str = "Student";

/// 没有学生评论时成绩册写入的占位文本
const NO_COMMENTS: &str = "There are no student comments for this assignment.";

/// 成绩册中的学生评论作为提交评论
pub fn work_comment(info: &SubmissionInfo) -> Option<String> {
    let comment = info.comment.trim();
    (!comment.is_empty() && comment != NO_COMMENTS).then(|| comment.to_string())
}

/// 按学生号找到用户，没有时创建；返回 (用户, 是否新建)
async fn student_for(
    storage: &Arc<dyn Storage>,
    course_id: i64,
    student_role: i64,
    info: &SubmissionInfo,
) -> Result<(User, bool)> {
    let (user, created) = match storage.get_user_by_username(&info.student_id).await? {
        Some(user) => (user, false),
        None => {
            let user = storage
                .create_user(NewUser {
                    name: info.student_name.clone(),
                    username: info.student_id.clone(),
                    email: String::new(),
                    password_hash: None,
                    lti_user_id: None,
                    role_id: None,
                })
                .await?;
            (user, true)
        }
    };
    if storage.user_course_role(user.id, course_id).await?.is_none() {
        storage
            .set_user_course_role(user.id, course_id, student_role)
            .await?;
    }
    Ok((user, created))
}

pub async fn bulk_upload(
    service: &SubmissionService,
    request: &HttpRequest,
    assignment_id: i64,
    payload: Multipart,
) -> ActixResult<HttpResponse> {
    ensure_feature(Feature::BlackboardZipUpload)?;
    let storage = service.get_storage(request);
    let assignment = lookup::assignment(&storage, assignment_id).await?;
    let (user, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanManageCourse, assignment.course_id)?;

    let student_role = storage
        .list_course_roles(assignment.course_id)
        .await?
        .into_iter()
        .find(|r| r.name == STUDENT_ROLE)
        .ok_or_else(|| {
            CGSystemError::invalid_state("The course has no Student role")
                .with_description(format!("Course {} has no role named {STUDENT_ROLE}", assignment.course_id))
        })?;

    let bg = Background::from_request(request);
    let scratch = tempfile::tempdir().map_err(CGSystemError::from)?;
    let max_size = AppConfig::get().upload.max_size;
    let mut files = save_files(payload, scratch.path(), |name| name.starts_with("file"), max_size).await?;
    if files.len() != 1 {
        return Err(CGSystemError::invalid_param("Exactly one blackboard zip should be uploaded")
            .with_description(format!("{} files were uploaded", files.len()))
            .into());
    }
    let file = files.remove(0);
    let upload_dir = bg.upload_dir.clone();
    let submissions = run_blocking(move || process_blackboard_zip(&file, &upload_dir)).await?;
    drop(scratch);

    let result = ingest(&bg, &assignment, student_role.id, &submissions).await;
    let (created, new_users) = match result {
        Ok(counts) => counts,
        Err(e) => {
            let blobs: Vec<String> = submissions.iter().flat_map(|(_, tree)| tree.blobs()).collect();
            remove_blobs(&bg.upload_dir, &blobs);
            return Err(e.into());
        }
    };

    let weights = storage.list_grader_weights(assignment.id).await?;
    if !weights.is_empty() {
        redivide(&bg, &assignment, weights).await?;
    }

    info!(
        "User {} imported {} blackboard submission(s) into assignment {}, {} new user(s)",
        user.id, created, assignment.id, new_users
    );
    Ok(HttpResponse::Created().json(BulkUploadResponse { created, new_users }))
}

async fn ingest(
    bg: &Arc<Background>,
    assignment: &Assignment,
    student_role: i64,
    submissions: &[(SubmissionInfo, FileTree)],
) -> Result<(usize, usize)> {
    let storage = &bg.storage;
    let _guard = bg.lock_division(assignment.id).await;
    let weights = storage.list_grader_weights(assignment.id).await?;
    let done: BTreeSet<i64> = storage.list_done_graders(assignment.id).await?.into_iter().collect();

    let mut new_users = 0;
    let mut loaded = BTreeSet::new();
    for (info, tree) in submissions {
        let (student, created) = student_for(storage, assignment.course_id, student_role, info).await?;
        if created {
            new_users += 1;
        }

        let previous = storage.latest_work_for_user(assignment.id, student.id).await?;
        let latest = storage.latest_works(assignment.id).await?;
        let grader = pick_grader(previous.as_ref(), &latest, &weights);
        storage
            .create_work(
                NewWork {
                    assignment_id: assignment.id,
                    user_id: student.id,
                    created_at: info.created_at,
                    assigned_to: grader,
                    grade: info.grade.map(|g| g.clamp(0.0, 10.0)),
                    comment: work_comment(info),
                },
                tree,
            )
            .await?;
        loaded.extend(grader.filter(|g| done.contains(g)));
    }

    for grader in &loaded {
        storage.set_grader_done(assignment.id, *grader, false).await?;
    }
    notify_reset(bg, assignment, loaded.into_iter().collect());
    Ok((submissions.len(), new_users))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn info(comment: &str) -> SubmissionInfo {
        SubmissionInfo {
            student_name: "Student One".into(),
            student_id: "s1234".into(),
            assignment_name: "Assignment 1".into(),
            created_at: Utc::now(),
            grade: None,
            text: String::new(),
            comment: comment.into(),
            files: Vec::new(),
        }
    }

    #[test]
    fn test_work_comment() {
        assert_eq!(work_comment(&info(" ")), None);
        assert_eq!(work_comment(&info(NO_COMMENTS)), None);
        assert_eq!(work_comment(&info("Late, sorry\n")).as_deref(), Some("Late, sorry"));
    }
}
