// storefront/src/web/extractors.rs

//! Identity extractors. Authentication happens upstream; the gateway in front
//! of this service forwards the caller's id and role as headers.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
}

fn user_id_from(req: &HttpRequest) -> Option<Uuid> {
  req
    .headers()
    .get(USER_ID_HEADER)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| Uuid::parse_str(v.trim()).ok())
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    match user_id_from(req) {
      Some(user_id) => ready(Ok(AuthenticatedUser { user_id })),
      None => {
        warn!("AuthenticatedUser extractor: Missing or invalid {} header.", USER_ID_HEADER);
        ready(Err(AppError::Auth("User authentication required".to_string())))
      }
    }
  }
}

/// An authenticated caller whose role is `admin`.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
  pub user_id: Uuid,
}

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let Some(user_id) = user_id_from(req) else {
      return ready(Err(AppError::Auth("User authentication required".to_string())));
    };
    let is_admin = req
      .headers()
      .get(USER_ROLE_HEADER)
      .and_then(|v| v.to_str().ok())
      .is_some_and(|role| role.trim().eq_ignore_ascii_case("admin"));
    if !is_admin {
      warn!(%user_id, "Non-admin caller attempted an admin operation.");
      return ready(Err(AppError::Forbidden("Admin role required".to_string())));
    }
    ready(Ok(AdminUser { user_id }))
  }
}
