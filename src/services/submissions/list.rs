use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::SubmissionService;
use super::response::submission_responses;
use crate::errors::{CGSystemError, Result};
use crate::models::permissions::entities::Perm;
use crate::models::submissions::requests::SubmissionListQuery;
use crate::models::submissions::responses::SubmissionResponse;
use crate::services::lookup;
use crate::services::permissions::{ensure_can_see_assignment, load_checker};

pub const CSV_HEADER: [&str; 6] = ["id", "user_name", "user_id", "grade", "comment", "created_at"];

/// 渲染成绩 CSV
pub fn render_csv(submissions: &[SubmissionResponse]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_error = |e: csv::Error| CGSystemError::serialization(format!("写入 CSV 失败: {e}"));
    writer.write_record(CSV_HEADER).map_err(csv_error)?;
    for sub in submissions {
        writer
            .write_record([
                sub.id.to_string(),
                sub.user.name.clone(),
                sub.user.id.to_string(),
                sub.grade.map(|g| g.to_string()).unwrap_or_default(),
                sub.comment.clone().unwrap_or_default(),
                sub.created_at.to_rfc3339(),
            ])
            .map_err(csv_error)?;
    }
    writer
        .into_inner()
        .map_err(|e| CGSystemError::serialization(format!("写入 CSV 失败: {e}")))
}

pub async fn list_submissions(
    service: &SubmissionService,
    request: &HttpRequest,
    assignment_id: i64,
    query: SubmissionListQuery,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let assignment = lookup::assignment(&storage, assignment_id).await?;
    let (user, checker) = load_checker(&storage, request).await?;
    ensure_can_see_assignment(&checker, &assignment)?;

    let owner = if checker.course(Perm::CanSeeOthersWork, assignment.course_id) {
        None
    } else {
        Some(user.id)
    };
    let works = storage.list_works(assignment.id, owner).await?;
    let extended = query.extended.is_some() || query.csv.is_some();
    let submissions = submission_responses(&storage, &checker, &assignment, &works, extended).await?;

    match query.csv {
        Some(name) => {
            let name = if name.is_empty() { format!("{}.csv", assignment.name) } else { name };
            Ok(HttpResponse::Ok()
                .content_type("text/csv")
                .insert_header(ContentDisposition {
                    disposition: DispositionType::Attachment,
                    parameters: vec![DispositionParam::Filename(name)],
                })
                .body(render_csv(&submissions)?))
        }
        None => Ok(HttpResponse::Ok().json(submissions)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::responses::UserResponse;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_render_csv() {
        let sub = SubmissionResponse {
            id: 3,
            user: UserResponse {
                id: 7,
                name: "Doe, Jane".into(),
                username: "jane".into(),
            },
            created_at: Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap(),
            assignee: None,
            grade: Some(7.5),
            grade_overridden: false,
            whitespace: false,
            comment: None,
        };
        let csv = String::from_utf8(render_csv(&[sub]).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("id,user_name,user_id,grade,comment,created_at"));
        assert_eq!(
            lines.next(),
            Some("3,\"Doe, Jane\",7,7.5,,2030-01-02T03:04:05+00:00")
        );
    }
}
