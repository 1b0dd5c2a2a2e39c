use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{LinterService, all_linters};
use crate::models::linters::entities::LinterCounts;
use crate::models::linters::responses::LinterListEntry;
use crate::models::permissions::entities::Perm;
use crate::services::lookup;
use crate::services::permissions::load_checker;

pub async fn list_linters(
    service: &LinterService,
    request: &HttpRequest,
    assignment_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let assignment = lookup::assignment(&storage, assignment_id).await?;
    let (_, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanUseLinter, assignment.course_id)?;

    let existing = storage.list_assignment_linters(assignment_id).await?;

    let mut entries = Vec::new();
    for linter in all_linters() {
        let mut entry = LinterListEntry {
            name: linter.name().to_string(),
            desc: linter.description().to_string(),
            opts: linter.default_options(),
            state: "new".to_string(),
            id: None,
        };
        if let Some(found) = existing.iter().find(|l| l.name == linter.name()) {
            let counts = LinterCounts::from_states(storage.linter_instance_states(&found.id).await?);
            entry.state = counts.aggregate().as_str().to_string();
            entry.id = Some(found.id.clone());
        }
        entries.push(entry);
    }

    Ok(HttpResponse::Ok().json(entries))
}
