pub mod assignments;
pub mod auth;
pub mod code;
pub mod courses;
pub mod ingest;
pub mod linters;
pub mod lookup;
pub mod lti;
pub mod mail;
pub mod mirror;
pub mod permissions;
pub mod rubrics;
pub mod submissions;
pub mod users;

pub use assignments::AssignmentService;
pub use auth::AuthService;
pub use code::CodeService;
pub use courses::CourseService;
pub use linters::LinterService;
pub use lti::LtiService;
pub use mirror::MirrorService;
pub use permissions::PermissionService;
pub use rubrics::RubricService;
pub use submissions::SubmissionService;
pub use users::UserService;
