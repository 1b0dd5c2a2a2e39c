use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::AssignmentService;
use super::detail::assignment_response;
use crate::errors::{CGSystemError, Result};
use crate::models::assignments::entities::{
    Assignment, AssignmentState, AssignmentUpdate, ReminderType, ReminderUpdate,
};
use crate::models::assignments::requests::PatchAssignmentRequest;
use crate::models::permissions::entities::Perm;
use crate::runtime::Background;
use crate::services::ingest::IgnoreFilter;
use crate::services::lookup;
use crate::services::lti::launch::parse_deadline;
use crate::services::lti::spawn_assignment_passback;
use crate::services::mail::ReminderScheduler;
use crate::services::mail::reminders::start_reminder;
use crate::services::permissions::load_checker;

/// 提醒时间至少在这之后
const MIN_REMINDER_DELAY: i64 = 60;

/// 提醒设置的变化
#[derive(Debug, Clone, PartialEq)]
pub enum ReminderChange {
    Keep,
    /// 取消已有提醒
    Clear { done_email: Option<String> },
    Schedule {
        kind: ReminderType,
        time: DateTime<Utc>,
        done_email: Option<String>,
    },
    /// 只修改完成通知地址
    DoneEmail(Option<String>),
}

fn invalid(message: &str, description: String) -> CGSystemError {
    CGSystemError::invalid_param(message.to_string()).with_description(description)
}

fn parse_time(value: &str, field: &str) -> Result<DateTime<Utc>> {
    parse_deadline(value).ok_or_else(|| {
        invalid(
            &format!("The given {field} is not a valid date"),
            format!("\"{value}\" is not an ISO 8601 datetime"),
        )
    })
}

fn done_email(value: Option<String>) -> Result<Option<String>> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => Ok(None),
        Some(v) if !v.contains('@') => Err(invalid(
            "The given done email is not valid",
            format!("\"{v}\" is not an email address"),
        )),
        other => Ok(other),
    }
}

/// 校验请求并得到要写入的更新
pub fn build_update(
    assignment: &Assignment,
    req: PatchAssignmentRequest,
    now: DateTime<Utc>,
) -> Result<(AssignmentUpdate, ReminderChange)> {
    let mut update = AssignmentUpdate::default();

    if let Some(name) = req.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(invalid(
                "The name of an assignment cannot be empty",
                "The \"name\" field is empty".into(),
            ));
        }
        if assignment.is_lti() && name != assignment.name {
            return Err(CGSystemError::invalid_state("The name of an LTI assignment is managed by the LMS")
                .with_description(format!("Assignment {} is connected to an LMS", assignment.id)));
        }
        update.name = Some(name);
    }

    if let Some(state) = req.state {
        update.state = Some(state.parse::<AssignmentState>().map_err(|e| {
            invalid("The given state is not valid", e)
        })?);
    }

    if let Some(deadline) = req.deadline {
        if assignment.is_lti() {
            return Err(CGSystemError::invalid_state("The deadline of an LTI assignment is managed by the LMS")
                .with_description(format!("Assignment {} is connected to an LMS", assignment.id)));
        }
        update.deadline = Some(parse_time(&deadline, "deadline")?);
    }

    if let Some(text) = req.ignore {
        if text.trim().is_empty() {
            update.cgignore = Some(None);
        } else {
            IgnoreFilter::new(&text)?;
            update.cgignore = Some(Some(text));
        }
    }

    let reminder = match (req.reminder_type, req.reminder_time) {
        (None, Some(_)) => {
            return Err(CGSystemError::missing_required_param(
                "\"reminder_type\" and \"reminder_time\" should be given together",
            ));
        }
        (Some(kind), time) => {
            let kind = kind
                .parse::<ReminderType>()
                .map_err(|e| invalid("The given reminder type is not valid", e))?;
            let done_email = done_email(req.done_email)?;
            match (kind, time) {
                (ReminderType::None, _) => ReminderChange::Clear { done_email },
                (_, None) => {
                    return Err(CGSystemError::missing_required_param(
                        "\"reminder_type\" and \"reminder_time\" should be given together",
                    ));
                }
                (kind, Some(time)) => {
                    let time = parse_time(&time, "reminder time")?;
                    if time < now + Duration::seconds(MIN_REMINDER_DELAY) {
                        return Err(invalid(
                            "The reminder time should be at least 60 seconds in the future",
                            format!("{time} is too early"),
                        ));
                    }
                    ReminderChange::Schedule {
                        kind,
                        time,
                        done_email,
                    }
                }
            }
        }
        (None, None) => match req.done_email {
            Some(value) => ReminderChange::DoneEmail(done_email(Some(value))?),
            None => ReminderChange::Keep,
        },
    };

    Ok((update, reminder))
}

pub async fn update_assignment(
    service: &AssignmentService,
    request: &HttpRequest,
    assignment_id: i64,
    req: PatchAssignmentRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let assignment = lookup::assignment(&storage, assignment_id).await?;
    let (user, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanManageCourse, assignment.course_id)?;

    let (mut update, change) = build_update(&assignment, req, Utc::now())?;
    let bg = Background::from_request(request);

    // 新任务在写入成功后才启动，旧任务在写入成功后才取消
    let mut start = None;
    let mut cancel_old = false;
    update.reminder = match change {
        ReminderChange::Keep => None,
        ReminderChange::DoneEmail(done_email) => Some(ReminderUpdate {
            reminder_type: assignment.reminder_type,
            reminder_time: assignment.reminder_time,
            task_id: assignment.reminder_task_id.clone(),
            done_email,
        }),
        ReminderChange::Clear { done_email } => {
            cancel_old = true;
            Some(ReminderUpdate {
                reminder_type: ReminderType::None,
                reminder_time: None,
                task_id: None,
                done_email,
            })
        }
        ReminderChange::Schedule {
            kind,
            time,
            done_email,
        } => {
            let task_id = ReminderScheduler::new_task_id();
            start = Some((task_id.clone(), time));
            cancel_old = true;
            Some(ReminderUpdate {
                reminder_type: kind,
                reminder_time: Some(time),
                task_id: Some(task_id),
                done_email,
            })
        }
    };

    let updated = storage.update_assignment(assignment.id, update).await?;
    info!("Assignment {} updated by user {}", assignment.id, user.id);

    if cancel_old && let Some(old) = &assignment.reminder_task_id {
        bg.reminders.cancel(old);
    }
    if let Some((task_id, time)) = start {
        start_reminder(&bg, assignment.id, task_id, time);
    }

    if !assignment.is_done() && updated.is_done() {
        spawn_assignment_passback(bg, updated.clone());
    }

    Ok(HttpResponse::Ok().json(assignment_response(&storage, &updated).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(lti: bool) -> Assignment {
        Assignment {
            id: 1,
            name: "Hello".into(),
            course_id: 1,
            state: AssignmentState::Open,
            deadline: Utc::now(),
            created_at: Utc::now(),
            lti_assignment_id: None,
            lti_outcome_service_url: lti.then(|| "https://lms.example.com/outcome".to_string()),
            cgignore: None,
            reminder_type: ReminderType::None,
            reminder_time: None,
            reminder_task_id: None,
            done_email: None,
        }
    }

    fn at(value: &str) -> DateTime<Utc> {
        parse_deadline(value).unwrap()
    }

    #[test]
    fn test_basic_fields() {
        let req = PatchAssignmentRequest {
            name: Some(" New ".into()),
            state: Some("done".into()),
            deadline: Some("2030-01-01T10:00:00Z".into()),
            ignore: Some("*.pyc\n".into()),
            ..Default::default()
        };
        let (update, reminder) = build_update(&assignment(false), req, Utc::now()).unwrap();
        assert_eq!(update.name.as_deref(), Some("New"));
        assert_eq!(update.state, Some(AssignmentState::Done));
        assert_eq!(update.deadline, Some(at("2030-01-01T10:00:00Z")));
        assert_eq!(update.cgignore, Some(Some("*.pyc\n".to_string())));
        assert_eq!(reminder, ReminderChange::Keep);
    }

    #[test]
    fn test_invalid_values() {
        let req = PatchAssignmentRequest {
            state: Some("closed".into()),
            ..Default::default()
        };
        let err = build_update(&assignment(false), req, Utc::now()).unwrap_err();
        assert_eq!(err.api_code(), "INVALID_PARAM");

        let req = PatchAssignmentRequest {
            deadline: Some("tomorrow".into()),
            ..Default::default()
        };
        let err = build_update(&assignment(false), req, Utc::now()).unwrap_err();
        assert_eq!(err.api_code(), "INVALID_PARAM");

        let req = PatchAssignmentRequest {
            deadline: Some("2030-01-01T10:00:00Z".into()),
            ..Default::default()
        };
        let err = build_update(&assignment(true), req, Utc::now()).unwrap_err();
        assert_eq!(err.api_code(), "INVALID_STATE");
    }

    #[test]
    fn test_reminder_needs_type_and_time() {
        let now = at("2030-01-01T10:00:00Z");
        let req = PatchAssignmentRequest {
            reminder_time: Some("2030-01-01T12:00:00Z".into()),
            ..Default::default()
        };
        let err = build_update(&assignment(false), req, now).unwrap_err();
        assert_eq!(err.api_code(), "MISSING_REQUIRED_PARAM");

        let req = PatchAssignmentRequest {
            reminder_type: Some("all-graders".into()),
            ..Default::default()
        };
        let err = build_update(&assignment(false), req, now).unwrap_err();
        assert_eq!(err.api_code(), "MISSING_REQUIRED_PARAM");
    }

    #[test]
    fn test_reminder_schedule_and_clear() {
        let now = at("2030-01-01T10:00:00Z");
        let req = PatchAssignmentRequest {
            reminder_type: Some("assigned-only".into()),
            reminder_time: Some("2030-01-01T11:00:00Z".into()),
            done_email: Some("teacher@example.com".into()),
            ..Default::default()
        };
        let (_, reminder) = build_update(&assignment(false), req, now).unwrap();
        assert_eq!(
            reminder,
            ReminderChange::Schedule {
                kind: ReminderType::AssignedOnly,
                time: at("2030-01-01T11:00:00Z"),
                done_email: Some("teacher@example.com".into()),
            }
        );

        let req = PatchAssignmentRequest {
            reminder_type: Some("none".into()),
            ..Default::default()
        };
        let (_, reminder) = build_update(&assignment(false), req, now).unwrap();
        assert_eq!(reminder, ReminderChange::Clear { done_email: None });
    }

    #[test]
    fn test_reminder_too_soon() {
        let now = at("2030-01-01T10:00:00Z");
        let req = PatchAssignmentRequest {
            reminder_type: Some("all-graders".into()),
            reminder_time: Some("2030-01-01T10:00:30Z".into()),
            ..Default::default()
        };
        let err = build_update(&assignment(false), req, now).unwrap_err();
        assert_eq!(err.api_code(), "INVALID_PARAM");
    }
}
