//! LTI 启动
//!
//! 第一步校验 LMS 的 OAuth 签名，把启动参数封进短期令牌后重定向到前端；
//! 第二步由前端带着令牌回调，同步用户、课程、作业和角色。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, http::header, web};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::info;

use super::LtiService;
use super::oauth::{HmacSha1Signer, LAUNCH_NONCES, encode, invalid_oauth, verify_launch};
use super::roles::{CourseRoleMatch, course_role_for, site_role_for};
use crate::config::{AppConfig, Feature};
use crate::errors::{CGSystemError, Result};
use crate::models::assignments::entities::{Assignment, AssignmentState, AssignmentUpdate, NewAssignment};
use crate::models::assignments::responses::AssignmentResponse;
use crate::models::courses::entities::{Course, NewCourse};
use crate::models::lti::entities::LaunchParams;
use crate::models::lti::responses::LaunchResponse;
use crate::models::users::entities::{NewUser, User};
use crate::services::linters::has_whitespace_linter;
use crate::services::lookup::{ensure_feature, ensure_feature_in};
use crate::services::permissions::default_course_roles;
use crate::storage::Storage;
use crate::utils::jwt::JwtUtils;

/// 签名时 LMS 看到的地址
fn request_url(request: &HttpRequest) -> String {
    let info = request.connection_info();
    format!("{}://{}{}", info.scheme(), info.host(), request.path())
}

/// 去掉 oauth_* 字段，记录 consumer key
pub fn launch_params(form: &[(String, String)], consumer_key: &str) -> LaunchParams {
    let mut params: BTreeMap<String, String> = form
        .iter()
        .filter(|(key, _)| !key.starts_with("oauth_"))
        .cloned()
        .collect();
    params.insert("lti_consumer_key".to_string(), consumer_key.to_string());
    LaunchParams(params)
}

pub async fn launch_first(
    _service: &LtiService,
    request: &HttpRequest,
    form: Vec<(String, String)>,
) -> ActixResult<HttpResponse> {
    ensure_feature(Feature::Lti)?;
    let config = AppConfig::get();

    let consumer_key = form
        .iter()
        .find(|(key, _)| key == "oauth_consumer_key")
        .map(|(_, value)| value.clone())
        .ok_or_else(invalid_oauth)?;
    let secret = config
        .lti
        .consumer_key_secrets
        .get(&consumer_key)
        .ok_or_else(invalid_oauth)?;

    let mut signed = form.clone();
    if let Ok(query) = web::Query::<Vec<(String, String)>>::from_query(request.query_string()) {
        signed.extend(query.into_inner());
    }
    verify_launch(
        &HmacSha1Signer,
        &request_url(request),
        &signed,
        &consumer_key,
        secret,
        &LAUNCH_NONCES,
        Utc::now().timestamp(),
    )
    .await?;

    let blob = JwtUtils::encode_launch(&launch_params(&form, &consumer_key))
        .map_err(|e| CGSystemError::unknown_error(format!("生成 LTI 令牌失败: {e}")))?;
    let location = format!(
        "{}/lti_launch/?inLTI=true&jwt={}",
        config.app.external_url.trim_end_matches('/'),
        encode(&blob)
    );
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish())
}

fn launch_blob(request: &HttpRequest) -> Option<String> {
    if let Some(value) = request.headers().get("Jwt").and_then(|v| v.to_str().ok()) {
        return Some(value.to_string());
    }
    web::Query::<BTreeMap<String, String>>::from_query(request.query_string())
        .ok()
        .and_then(|query| query.get("jwt").cloned())
}

pub async fn launch_second(service: &LtiService, request: &HttpRequest) -> ActixResult<HttpResponse> {
    ensure_feature(Feature::Lti)?;

    let blob = launch_blob(request).unwrap_or_default();
    let params = JwtUtils::decode_launch(&blob).map_err(|e| {
        CGSystemError::invalid_param(
            "Decoding given JWT token failed, LTI is probably not configured right. \
             Please contact your site admin.",
        )
        .with_description(format!("The decoding of the launch token failed: {e}"))
    })?;

    let storage = service.get_storage(request);
    let outcome = process_launch(&storage, AppConfig::get(), &params).await?;
    let whitespace = has_whitespace_linter(&storage, outcome.assignment.id).await?;

    Ok(HttpResponse::Ok().json(LaunchResponse {
        assignment: AssignmentResponse::new(&outcome.assignment, &outcome.course.name, whitespace),
        access_token: Some(outcome.access_token),
        new_role_created: outcome.new_role_created,
        updated_email: outcome.updated_email,
    }))
}

pub struct LaunchOutcome {
    pub user: User,
    pub course: Course,
    pub assignment: Assignment,
    pub access_token: String,
    pub new_role_created: Option<String>,
    pub updated_email: Option<String>,
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    value.ok_or_else(|| {
        CGSystemError::missing_required_param("The LTI launch is missing a required parameter")
            .with_description(format!("The launch parameter \"{name}\" was not given"))
    })
}

/// 第二步启动的全部同步工作
pub async fn process_launch(
    storage: &Arc<dyn Storage>,
    config: &AppConfig,
    params: &LaunchParams,
) -> Result<LaunchOutcome> {
    let (user, updated_email) = ensure_lti_user(storage, params).await?;
    let course = ensure_course(storage, params).await?;
    let assignment = ensure_assignment(storage, params, &course, &user).await?;

    if user.role_id.is_none() {
        let name = site_role_for(&params.roles(), &config.app.default_role);
        let role = storage.get_site_role_by_name(&name).await?.ok_or_else(|| {
            CGSystemError::object_not_found("The site role for this LTI user does not exist")
                .with_description(format!("There is no site role named \"{name}\""))
        })?;
        storage.set_user_site_role(user.id, role.id).await?;
    }

    let new_role_created = ensure_course_role(storage, config, params, &user, &course).await?;

    let access_token = JwtUtils::generate_access_token(user.id)
        .map_err(|e| CGSystemError::unknown_error(format!("生成访问令牌失败: {e}")))?;
    info!(
        "LTI launch for user {} on assignment {} in course {}",
        user.id, assignment.id, course.id
    );

    Ok(LaunchOutcome {
        user,
        course,
        assignment,
        access_token,
        new_role_created,
        updated_email,
    })
}

/// `name`, `name (1)`, `name (2)`, ... 中第一个未被占用的
pub fn dedupe_username(base: &str, taken: &HashSet<String>) -> String {
    let mut candidate = base.to_string();
    let mut i = 0;
    while taken.contains(&candidate) {
        i += 1;
        candidate = format!("{base} ({i})");
    }
    candidate
}

async fn ensure_lti_user(
    storage: &Arc<dyn Storage>,
    params: &LaunchParams,
) -> Result<(User, Option<String>)> {
    let lti_user_id = required(params.user_id(), "user_id")?;

    if let Some(user) = storage.get_user_by_lti_id(lti_user_id).await? {
        // 没有邮箱的用户使用 LMS 提供的邮箱
        if user.email.is_empty()
            && let Some(email) = params.user_email()
        {
            storage.update_user_email(user.id, email).await?;
            let user = User {
                email: email.to_string(),
                ..user
            };
            return Ok((user, Some(email.to_string())));
        }
        return Ok((user, None));
    }

    let base = params.username().unwrap_or(lti_user_id);
    let taken: HashSet<String> = storage.usernames_with_prefix(base).await?.into_iter().collect();
    let username = dedupe_username(base, &taken);

    let user = storage
        .create_user(NewUser {
            name: params.full_name().unwrap_or(base).to_string(),
            username,
            email: params.user_email().unwrap_or_default().to_string(),
            password_hash: None,
            lti_user_id: Some(lti_user_id.to_string()),
            role_id: None,
        })
        .await?;
    info!("Created LTI user {} ({})", user.username, user.id);
    Ok((user, None))
}

async fn ensure_course(storage: &Arc<dyn Storage>, params: &LaunchParams) -> Result<Course> {
    let consumer_key = required(params.consumer_key(), "oauth_consumer_key")?;
    let lti_course_id = required(params.course_id(), "custom_canvas_course_id")?;
    let name = params.course_name().unwrap_or(lti_course_id);

    let provider_id = storage.get_or_create_lti_provider(consumer_key).await?;
    if let Some(course) = storage.get_course_by_lti_id(provider_id, lti_course_id).await? {
        if course.name != name {
            storage.update_course_name(course.id, name).await?;
            return Ok(Course {
                name: name.to_string(),
                ..course
            });
        }
        return Ok(course);
    }

    storage
        .create_course(NewCourse {
            name: name.to_string(),
            lti_course_id: Some(lti_course_id.to_string()),
            lti_provider_id: Some(provider_id),
            roles: default_course_roles(),
            owner: None,
        })
        .await
}

/// 解析失败时返回 None
pub fn parse_deadline(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(deadline) = DateTime::parse_from_rfc3339(value) {
        return Some(deadline.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn launch_state(params: &LaunchParams) -> AssignmentState {
    if params.assignment_published() {
        AssignmentState::Open
    } else {
        AssignmentState::Hidden
    }
}

async fn ensure_assignment(
    storage: &Arc<dyn Storage>,
    params: &LaunchParams,
    course: &Course,
    user: &User,
) -> Result<Assignment> {
    let lti_assignment_id = required(params.assignment_id(), "custom_canvas_assignment_id")?;
    let deadline = params.assignment_due().and_then(parse_deadline);

    let assignment = match storage.get_assignment_by_lti_id(lti_assignment_id).await? {
        Some(existing) => {
            let update = AssignmentUpdate {
                // 已完成的作业不会被 LMS 重新打开
                state: (!existing.is_done()).then(|| launch_state(params)),
                deadline,
                lti_outcome_service_url: params
                    .outcome_service_url()
                    .map(|url| Some(url.to_string())),
                ..Default::default()
            };
            storage.update_assignment(existing.id, update).await?
        }
        None => {
            storage
                .create_assignment(NewAssignment {
                    name: params
                        .assignment_name()
                        .unwrap_or(lti_assignment_id)
                        .to_string(),
                    course_id: course.id,
                    state: launch_state(params),
                    deadline: deadline.unwrap_or_else(|| Utc::now() + Duration::days(365)),
                    lti_assignment_id: Some(lti_assignment_id.to_string()),
                    lti_outcome_service_url: params.outcome_service_url().map(String::from),
                })
                .await?
        }
    };

    if let Some(sourcedid) = params.result_sourcedid() {
        storage
            .set_assignment_result(user.id, assignment.id, sourcedid)
            .await?;
    }
    Ok(assignment)
}

/// 用户尚未加入课程时按 LTI 角色加入，返回新建的角色名
async fn ensure_course_role(
    storage: &Arc<dyn Storage>,
    config: &AppConfig,
    params: &LaunchParams,
    user: &User,
    course: &Course,
) -> Result<Option<String>> {
    if storage.user_course_role(user.id, course.id).await?.is_some() {
        return Ok(None);
    }

    let existing = storage.list_course_roles(course.id).await?;
    let (role_id, created) = match course_role_for(&params.roles()) {
        CourseRoleMatch::Known(name) => {
            let role = existing.iter().find(|r| r.name == name).ok_or_else(|| {
                CGSystemError::object_not_found("The course role for this LTI user does not exist")
                    .with_description(format!("Course {} has no role named \"{name}\"", course.id))
            })?;
            (role.id, None)
        }
        CourseRoleMatch::Unknown(name) => {
            ensure_feature_in(config, Feature::AutomaticLtiRole).map_err(|_| {
                CGSystemError::invalid_state(
                    "The given LTI role was not valid found, please ask your instructor or site admin.",
                )
                .with_description(format!(
                    "No role in \"{}\" is a known LTI role",
                    params.roles().join(",")
                ))
            })?;
            match existing.iter().find(|r| r.name == name) {
                Some(role) => (role.id, None),
                None => {
                    let role = storage.create_course_role(course.id, &name, &[]).await?;
                    info!("Created LTI course role \"{}\" in course {}", name, course.id);
                    (role.id, Some(name))
                }
            }
        }
    };

    storage.set_user_course_role(user.id, course.id, role_id).await?;
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_username() {
        let taken: HashSet<String> = ["thomas", "thomas (1)"].iter().map(|s| s.to_string()).collect();
        assert_eq!(dedupe_username("thomas", &taken), "thomas (2)");
        assert_eq!(dedupe_username("anna", &taken), "anna");
    }

    #[test]
    fn test_launch_params_strip_oauth() {
        let form = vec![
            ("oauth_signature".to_string(), "sig".to_string()),
            ("oauth_nonce".to_string(), "n".to_string()),
            ("user_id".to_string(), "42".to_string()),
            ("roles".to_string(), "Instructor,Learner".to_string()),
        ];
        let params = launch_params(&form, "canvas");
        assert_eq!(params.user_id(), Some("42"));
        assert_eq!(params.consumer_key(), Some("canvas"));
        assert_eq!(params.roles(), vec!["Instructor", "Learner"]);
        assert!(params.0.keys().all(|k| !k.starts_with("oauth_")));
    }

    #[test]
    fn test_parse_deadline() {
        let deadline = parse_deadline("2018-01-31T22:59:00Z").unwrap();
        assert_eq!(deadline.to_rfc3339(), "2018-01-31T22:59:00+00:00");
        let deadline = parse_deadline("2018-01-31T23:59:00+01:00").unwrap();
        assert_eq!(deadline.to_rfc3339(), "2018-01-31T22:59:00+00:00");
        assert!(parse_deadline("2018-01-31 22:59:00").is_some());
        assert!(parse_deadline("next tuesday").is_none());
    }

    #[test]
    fn test_launch_state() {
        let mut params = LaunchParams::default();
        assert_eq!(launch_state(&params), AssignmentState::Hidden);
        params
            .0
            .insert("custom_canvas_assignment_published".into(), "true".into());
        assert_eq!(launch_state(&params), AssignmentState::Open);
    }
}
