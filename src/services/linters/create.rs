use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, http::StatusCode};
use tracing::info;
use uuid::Uuid;

use super::{LinterService, get_linter, runner};
use crate::errors::CGSystemError;
use crate::models::linters::entities::{AssignmentLinter, LinterCounts, LinterInstance, LinterState};
use crate::models::linters::requests::CreateLinterRequest;
use crate::models::linters::responses::LinterDetailResponse;
use crate::models::permissions::entities::Perm;
use crate::runtime::Background;
use crate::services::lookup;
use crate::services::permissions::load_checker;

pub async fn create_linter(
    service: &LinterService,
    request: &HttpRequest,
    assignment_id: i64,
    req: CreateLinterRequest,
) -> ActixResult<HttpResponse> {
    let (Some(name), Some(cfg)) = (req.name, req.cfg) else {
        return Err(CGSystemError::missing_required_param("Both \"name\" and \"cfg\" are required").into());
    };

    let storage = service.get_storage(request);
    let assignment = lookup::assignment(&storage, assignment_id).await?;
    let (user, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanUseLinter, assignment.course_id)?;

    let linter = get_linter(&name)?;

    if let Some(existing) = storage
        .list_assignment_linters(assignment_id)
        .await?
        .into_iter()
        .find(|l| l.name == name)
    {
        let counts = LinterCounts::from_states(storage.linter_instance_states(&existing.id).await?);
        let message = if counts.working > 0 {
            "There is still a linter instance running"
        } else {
            "This linter was already run on this assignment, delete it first"
        };
        return Err(CGSystemError::invalid_state(message)
            .with_description(format!(
                "There is a linter named \"{name}\" for assignment {assignment_id}"
            ))
            .with_status(StatusCode::CONFLICT)
            .into());
    }

    let state = if linter.runs_externally() {
        LinterState::Running
    } else {
        LinterState::Done
    };
    let assignment_linter = AssignmentLinter {
        id: Uuid::new_v4().to_string(),
        assignment_id,
        name: name.clone(),
        config: cfg.clone(),
    };
    let instances: Vec<LinterInstance> = storage
        .latest_works(assignment_id)
        .await?
        .into_iter()
        .map(|work| LinterInstance {
            id: Uuid::new_v4().to_string(),
            work_id: work.id,
            tester_id: assignment_linter.id.clone(),
            state,
            error: None,
        })
        .collect();

    storage
        .create_assignment_linter(assignment_linter.clone(), instances.clone())
        .await?;
    info!(
        "User {} started {} on assignment {} with {} instance(s)",
        user.id,
        name,
        assignment_id,
        instances.len()
    );

    if linter.runs_externally() {
        let jobs = instances
            .iter()
            .map(|i| runner::LintJob {
                instance_id: i.id.clone(),
                work_id: i.work_id,
            })
            .collect();
        runner::start_run(Background::from_request(request), linter, cfg, jobs);
    }

    Ok(HttpResponse::Ok().json(LinterDetailResponse {
        id: assignment_linter.id,
        name,
        counts: LinterCounts::from_states(instances.iter().map(|i| i.state)),
    }))
}
