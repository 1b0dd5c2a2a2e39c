use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::HashMap;
use tracing::info;

use super::AssignmentService;
use super::division::redivide;
use crate::errors::{CGSystemError, Result};
use crate::models::assignments::entities::GraderWeight;
use crate::models::assignments::requests::DivideRequest;
use crate::models::permissions::entities::Perm;
use crate::runtime::Background;
use crate::services::lookup;
use crate::services::permissions::{load_checker, users_with_course_perm};

/// 解析 `{user_id: weight}`，按用户 id 排序
pub fn parse_weights(graders: HashMap<String, f64>) -> Result<Vec<GraderWeight>> {
    let mut weights = graders
        .into_iter()
        .map(|(key, weight)| {
            let user_id = key.parse::<i64>().map_err(|_| {
                CGSystemError::invalid_param("The given grader id is not valid")
                    .with_description(format!("\"{key}\" is not a user id"))
            })?;
            if weight < 0.0 || !weight.is_finite() {
                return Err(CGSystemError::invalid_param("Grader weights cannot be negative")
                    .with_description(format!("User {user_id} has weight {weight}")));
            }
            Ok(GraderWeight { user_id, weight })
        })
        .collect::<Result<Vec<_>>>()?;
    weights.sort_by_key(|w| w.user_id);
    Ok(weights)
}

pub async fn divide(
    service: &AssignmentService,
    request: &HttpRequest,
    assignment_id: i64,
    req: DivideRequest,
) -> ActixResult<HttpResponse> {
    let Some(graders) = req.graders else {
        return Err(CGSystemError::missing_required_param("The \"graders\" field is required")
            .with_description("Pass an object mapping user ids to weights")
            .into());
    };

    let storage = service.get_storage(request);
    let assignment = lookup::assignment(&storage, assignment_id).await?;
    let (user, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanManageCourse, assignment.course_id)?;

    let weights = parse_weights(graders)?;
    let allowed: Vec<i64> = users_with_course_perm(&storage, assignment.course_id, Perm::CanGradeWork)
        .await?
        .iter()
        .map(|u| u.id)
        .collect();
    if let Some(bad) = weights.iter().find(|w| !allowed.contains(&w.user_id)) {
        return Err(CGSystemError::invalid_param("Not all given users can grade work in this course")
            .with_description(format!("User {} does not have can_grade_work", bad.user_id))
            .into());
    }

    redivide(&Background::from_request(request), &assignment, weights).await?;
    info!("User {} divided assignment {}", user.id, assignment.id);

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weights() {
        let graders: HashMap<String, f64> = [("3".to_string(), 1.0), ("1".to_string(), 2.5)].into();
        let weights = parse_weights(graders).unwrap();
        assert_eq!(weights[0], GraderWeight { user_id: 1, weight: 2.5 });
        assert_eq!(weights[1].user_id, 3);

        assert!(parse_weights(HashMap::new()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_weights_rejects_garbage() {
        let err = parse_weights([("abc".to_string(), 1.0)].into()).unwrap_err();
        assert_eq!(err.api_code(), "INVALID_PARAM");

        let err = parse_weights([("1".to_string(), -1.0)].into()).unwrap_err();
        assert_eq!(err.api_code(), "INVALID_PARAM");
    }
}
