use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::UserService;
use crate::errors::{CGSystemError, Result};
use crate::models::permissions::entities::Perm;
use crate::models::users::requests::UserSearchQuery;
use crate::models::users::responses::UserResponse;
use crate::services::permissions::load_checker;

const SEARCH_LIMIT: u64 = 50;

/// 搜索串至少 3 个字符
pub fn validate_query(query: Option<&str>) -> Result<&str> {
    let query = query.ok_or_else(|| {
        CGSystemError::missing_required_param("The search string is required")
            .with_description("The query parameter \"q\" was not given")
    })?;
    if query.chars().count() < 3 {
        return Err(CGSystemError::invalid_param("The search string should be at least 3 chars")
            .with_description(format!("The search string \"{query}\" is not 3 chars or longer.")));
    }
    Ok(query)
}

pub async fn search_users(
    service: &UserService,
    request: &HttpRequest,
    query: UserSearchQuery,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let (_, checker) = load_checker(&storage, request).await?;
    checker.ensure_site(Perm::CanSearchUsers)?;

    let q = validate_query(query.q.as_deref())?;
    let users: Vec<UserResponse> = storage
        .search_users(q, SEARCH_LIMIT)
        .await?
        .iter()
        .map(UserResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(users))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_length() {
        assert_eq!(validate_query(Some("tho")).unwrap(), "tho");
        assert_eq!(validate_query(Some("th")).unwrap_err().api_code(), "INVALID_PARAM");
        assert_eq!(validate_query(None).unwrap_err().api_code(), "MISSING_REQUIRED_PARAM");
        // 按字符计数
        assert!(validate_query(Some("éé")).is_err());
    }
}
