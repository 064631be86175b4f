//! Backend trait wiring the gate to its collaborators.

use crate::auth::CookieSettings;
use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::refresh::RefreshTokenService;

/// Trait for router state types that provide everything the gate needs.
pub trait HasAuthBackend {
    fn jwt(&self) -> &JwtConfig;
    fn db(&self) -> &Database;
    fn refresh(&self) -> &RefreshTokenService;
    fn cookies(&self) -> &CookieSettings;
}

/// Implement `HasAuthBackend` for a state struct with the standard fields:
/// `jwt: Arc<JwtConfig>`, `db: Database`, `refresh: RefreshTokenService`,
/// `cookies: CookieSettings`.
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn jwt(&self) -> &$crate::jwt::JwtConfig {
                &self.jwt
            }
            fn db(&self) -> &$crate::db::Database {
                &self.db
            }
            fn refresh(&self) -> &$crate::refresh::RefreshTokenService {
                &self.refresh
            }
            fn cookies(&self) -> &$crate::auth::CookieSettings {
                &self.cookies
            }
        }
    };
}
