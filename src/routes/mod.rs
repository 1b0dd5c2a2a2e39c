pub mod assignments;

pub mod auth;

pub mod code;

pub mod courses;

pub mod linters;

pub mod lti;

pub mod mirror;

pub mod permissions;

pub mod submissions;

pub mod users;

pub use assignments::configure_assignment_routes;
pub use auth::configure_auth_routes;
pub use code::configure_code_routes;
pub use courses::configure_course_routes;
pub use linters::configure_linter_routes;
pub use lti::configure_lti_routes;
pub use mirror::configure_mirror_routes;
pub use permissions::configure_permission_routes;
pub use submissions::configure_submission_routes;
pub use users::configure_user_routes;
