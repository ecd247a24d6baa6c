pub mod auth;
pub mod extract;
pub mod rate_limit;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser, RoleGuard};
pub use extract::{parse_uuid, JsonBody, RequestMeta};
pub use rate_limit::{build_limiter, rate_limit_middleware};
pub use response::{ApiResponse, ApiResult};
