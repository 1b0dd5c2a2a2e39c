use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{CGSystemError, Result};
use crate::models::assignments::entities::Assignment;
use crate::models::permissions::entities::Perm;
use crate::models::submissions::entities::Work;
use crate::models::submissions::responses::SubmissionResponse;
use crate::models::users::entities::User;
use crate::models::users::responses::UserResponse;
use crate::services::linters::has_whitespace_linter;
use crate::services::permissions::{PermissionChecker, can_see_feedback};
use crate::services::rubrics::grade::work_grade;
use crate::storage::Storage;

/// 批量渲染提交；成绩、评论与空白字符标记按查看者权限隐藏
pub async fn submission_responses(
    storage: &Arc<dyn Storage>,
    checker: &PermissionChecker,
    assignment: &Assignment,
    works: &[Work],
    extended: bool,
) -> Result<Vec<SubmissionResponse>> {
    let mut ids: Vec<i64> = works
        .iter()
        .flat_map(|w| std::iter::once(w.user_id).chain(w.assigned_to))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    let users: HashMap<i64, User> = storage
        .get_users_by_ids(&ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let feedback = can_see_feedback(checker, assignment);
    let show_comment = feedback
        && (extended
            || assignment.is_done()
            || checker.course(Perm::CanGradeWork, assignment.course_id));
    let whitespace = feedback && has_whitespace_linter(storage, assignment.id).await?;

    let mut out = Vec::with_capacity(works.len());
    for work in works {
        let Some(user) = users.get(&work.user_id) else {
            continue;
        };
        let grade = if feedback {
            work_grade(storage, work).await?
        } else {
            Default::default()
        };
        out.push(SubmissionResponse {
            id: work.id,
            user: UserResponse::from(user),
            created_at: work.created_at,
            assignee: work
                .assigned_to
                .and_then(|id| users.get(&id))
                .map(UserResponse::from),
            grade: grade.grade,
            grade_overridden: grade.overridden,
            whitespace,
            comment: if show_comment { work.comment.clone() } else { None },
        });
    }
    Ok(out)
}

pub async fn submission_response(
    storage: &Arc<dyn Storage>,
    checker: &PermissionChecker,
    assignment: &Assignment,
    work: &Work,
    extended: bool,
) -> Result<SubmissionResponse> {
    submission_responses(storage, checker, assignment, std::slice::from_ref(work), extended)
        .await?
        .pop()
        .ok_or_else(|| {
            CGSystemError::object_not_found("The author of this submission was not found")
                .with_description(format!("User {} does not exist", work.user_id))
        })
}
