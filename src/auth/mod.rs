//! Session credentials and ownership enforcement.
//!
//! Requests move through an ordered pipeline, stopping at the first failure:
//!
//! - **Unauthenticated**: the credential is read from the `token` cookie
//!   ([`CookieConfig::extract`]) and verified ([`TokenCodec::verify`]).
//!   Missing or invalid credentials end the request with `401`.
//! - **Authenticated**: [`require_auth`] stores an [`AuthContext`] in the
//!   request extensions.
//! - **Authorized**: identity-scoped routes take an [`Owner`], which compares
//!   the verified identity to the one named in the query string. A mismatch
//!   ends the request with `403`.
//! - **Handled**: the route handler runs.
//!
//! ## Security Model
//!
//! - All session state lives in the signed credential; there is no server-side
//!   session table, so a credential stays valid until it expires.
//! - The cookie is `HttpOnly` and carries an explicit `SameSite` policy.
//! - Failure kinds are logged distinctly but never revealed to the caller.
//!
//! ## Usage
//!
//! ```ignore
//! let auth = AuthState::new(TokenCodec::new(&secret), CookieConfig::default());
//!
//! let protected = Router::new()
//!     .route("/applications", get(list_my_applications))
//!     .route_layer(axum::middleware::from_fn_with_state(auth, require_auth));
//!
//! async fn list_my_applications(owner: Owner) -> String {
//!     owner.identity().to_string()
//! }
//! ```

mod claims;
mod codec;
mod context;
mod cookie;
mod error;
mod guard;
mod middleware;

pub use claims::{Claims, IssueRequest, RESERVED_CLAIMS};
pub use codec::{
    DEFAULT_TOKEN_TTL_SECONDS, MIN_SECRET_LEN, SecretError, SigningSecret, TokenCodec, TokenError,
};
pub use context::AuthContext;
pub use cookie::{CookieConfig, DEFAULT_COOKIE_NAME, SameSite};
pub use error::{AuthError, FORBIDDEN_MESSAGE, UNAUTHORIZED_MESSAGE};
pub use guard::{Authorized, Owner, authorize};
pub use middleware::{AuthState, authenticate, require_auth};
