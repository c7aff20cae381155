use crate::error::{AppError, AppResult};
use actix_web::http::Method;
use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

/// 调用方角色（由上游网关鉴权后透传）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerRole {
    User,
    Organization,
    Admin,
}

impl CallerRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(CallerRole::User),
            "organization" => Some(CallerRole::Organization),
            "admin" => Some(CallerRole::Admin),
            _ => None,
        }
    }
}

/// 调用方身份。令牌签发与校验在网关完成，
/// 本服务信任 X-Caller-Id / X-Caller-Role 透传的结果
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity {
    pub id: i64,
    pub role: CallerRole,
}

impl CallerIdentity {
    pub fn require_user(&self) -> AppResult<i64> {
        if self.role == CallerRole::User {
            Ok(self.id)
        } else {
            Err(AppError::Forbidden("User role required".to_string()))
        }
    }

    pub fn require_organization(&self) -> AppResult<i64> {
        if self.role == CallerRole::Organization {
            Ok(self.id)
        } else {
            Err(AppError::Forbidden("Organization role required".to_string()))
        }
    }

    pub fn require_organization_or_admin(&self) -> AppResult<i64> {
        if matches!(self.role, CallerRole::Organization | CallerRole::Admin) {
            Ok(self.id)
        } else {
            Err(AppError::Forbidden(
                "Organization or admin role required".to_string(),
            ))
        }
    }

    pub fn require_admin(&self) -> AppResult<i64> {
        if self.role == CallerRole::Admin {
            Ok(self.id)
        } else {
            Err(AppError::Forbidden("Admin role required".to_string()))
        }
    }
}

/// 从请求扩展中获取调用方身份（中间件在入口处注入）
pub fn caller_identity(req: &HttpRequest) -> AppResult<CallerIdentity> {
    req.extensions()
        .get::<CallerIdentity>()
        .copied()
        .ok_or_else(|| AppError::AuthError("Missing caller identity".to_string()))
}

// 公开路径配置
struct PublicPaths {
    exact_paths: Vec<&'static str>,
    prefix_paths: Vec<&'static str>,
    // 仅 GET 公开的列表 / 详情路径
    public_get_roots: Vec<&'static str>,
}

impl PublicPaths {
    fn new() -> Self {
        Self {
            exact_paths: vec!["/swagger-ui", "/swagger-ui/", "/api-docs/openapi.json"],
            prefix_paths: vec!["/swagger-ui/", "/api-docs/"],
            public_get_roots: vec!["/api/v1/events", "/api/v1/gifts"],
        }
    }

    fn is_public(&self, method: &Method, path: &str) -> bool {
        if self.exact_paths.contains(&path) {
            return true;
        }
        if self
            .prefix_paths
            .iter()
            .any(|&prefix| path.starts_with(prefix))
        {
            return true;
        }

        if *method != Method::GET {
            return false;
        }
        self.public_get_roots.iter().any(|&root| {
            if path == root {
                return true;
            }
            // 仅数字 ID 的详情路径公开，子资源仍需身份
            path.strip_prefix(root)
                .and_then(|rest| rest.strip_prefix('/'))
                .map(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
                .unwrap_or(false)
        })
    }
}

pub struct IdentityMiddleware;

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService {
            service,
            public_paths: PublicPaths::new(),
        }))
    }
}

pub struct IdentityMiddlewareService<S> {
    service: S,
    public_paths: PublicPaths,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // 放行所有 CORS 预检请求
        if req.method() == Method::OPTIONS {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        if self.public_paths.is_public(req.method(), req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let caller_id = req
            .headers()
            .get("X-Caller-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok());
        let caller_role = req
            .headers()
            .get("X-Caller-Role")
            .and_then(|v| v.to_str().ok())
            .and_then(CallerRole::parse);

        match (caller_id, caller_role) {
            (Some(id), Some(role)) => {
                req.extensions_mut().insert(CallerIdentity { id, role });
                let fut = self.service.call(req);
                Box::pin(fut)
            }
            _ => {
                let error = AppError::AuthError("Missing or invalid caller identity".to_string());
                Box::pin(async move { Err(error.into()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swagger_paths_are_public() {
        let paths = PublicPaths::new();
        assert!(paths.is_public(&Method::GET, "/swagger-ui/"));
        assert!(paths.is_public(&Method::GET, "/api-docs/openapi.json"));
    }

    #[test]
    fn event_listing_and_detail_are_public_for_get_only() {
        let paths = PublicPaths::new();
        assert!(paths.is_public(&Method::GET, "/api/v1/events"));
        assert!(paths.is_public(&Method::GET, "/api/v1/events/42"));
        assert!(paths.is_public(&Method::GET, "/api/v1/gifts/7"));
        assert!(!paths.is_public(&Method::POST, "/api/v1/events"));
        assert!(!paths.is_public(&Method::DELETE, "/api/v1/events/42"));
    }

    #[test]
    fn sub_resources_still_require_identity() {
        let paths = PublicPaths::new();
        assert!(!paths.is_public(&Method::GET, "/api/v1/events/42/statistics"));
        assert!(!paths.is_public(&Method::GET, "/api/v1/events/user/history"));
        assert!(!paths.is_public(&Method::GET, "/api/v1/gifts/user/history"));
        assert!(!paths.is_public(&Method::GET, "/api/v1/admin/dashboard"));
    }

    #[test]
    fn caller_role_parsing() {
        assert_eq!(CallerRole::parse("user"), Some(CallerRole::User));
        assert_eq!(
            CallerRole::parse("organization"),
            Some(CallerRole::Organization)
        );
        assert_eq!(CallerRole::parse("admin"), Some(CallerRole::Admin));
        assert_eq!(CallerRole::parse("root"), None);
    }

    #[test]
    fn role_guards() {
        let user = CallerIdentity {
            id: 7,
            role: CallerRole::User,
        };
        assert_eq!(user.require_user().unwrap(), 7);
        assert!(user.require_organization().is_err());
        assert!(user.require_admin().is_err());

        let admin = CallerIdentity {
            id: 1,
            role: CallerRole::Admin,
        };
        assert!(admin.require_admin().is_ok());
        assert!(admin.require_organization_or_admin().is_ok());
    }
}
