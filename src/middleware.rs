// src/middleware.rs

//! Authorization gates. Each is an `axum::middleware::from_fn_with_state`
//! function; they run in the order session, role, terms. Page routes answer a
//! rejection with a redirect, API routes with a status code.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    error::AppError,
    models::user::{Role, User},
    state::AppState,
};

/// Where an unauthenticated visitor is sent.
pub const LOGIN_PATH: &str = "/login";

/// Where a user with an insufficient role is sent.
pub const FORBIDDEN_PATH: &str = "/forbidden";

/// Where a user who has not accepted the terms is sent.
pub const ACCEPT_TERMS_PATH: &str = "/quiz/accept-terms";

/// Routes reachable without having accepted the terms.
pub const TERMS_EXEMPT_PATHS: &[&str] = &[ACCEPT_TERMS_PATH, "/api/v1/quiz/accept-terms"];

/// The authenticated user, fetched from the store on this request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// How a gate answers a request it turns away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnReject {
    /// Browser pages: 307 to a page explaining what to do.
    Redirect,
    /// API routes: 401 / 403 / 409.
    Status,
}

#[derive(Clone)]
pub struct AuthGate {
    pub state: AppState,
    pub on_reject: OnReject,
}

#[derive(Debug, Clone, Copy)]
pub struct RoleGate {
    pub allowed: &'static [Role],
    pub on_reject: OnReject,
}

#[derive(Debug, Clone, Copy)]
pub struct TermsGate {
    pub on_reject: OnReject,
}

/// Loads the session and the user it names. A missing, invalid or expired
/// session, or one for a user that no longer exists, is unauthenticated.
pub async fn require_session(
    State(gate): State<AuthGate>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(session) = gate.state.sessions.session_from_headers(req.headers()) else {
        return reject_unauthenticated(&gate, &req);
    };

    let user = match gate.state.store.get_user(session.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::debug!(user_id = session.user_id, "Session names an unknown user");
            return reject_unauthenticated(&gate, &req);
        }
        Err(e) => {
            tracing::error!("Failed to load session user: {:?}", e);
            return AppError::from(e).into_response();
        }
    };

    req.extensions_mut().insert(CurrentUser(user));
    next.run(req).await
}

/// Must run after `require_session`.
pub async fn require_role(State(gate): State<RoleGate>, req: Request<Body>, next: Next) -> Response {
    let Some(CurrentUser(user)) = req.extensions().get::<CurrentUser>() else {
        return AppError::AuthError("Authentication required".to_string()).into_response();
    };

    if !gate.allowed.contains(&user.role) {
        tracing::debug!(user_id = user.id, role = %user.role, path = req.uri().path(), "Role rejected");
        return match gate.on_reject {
            OnReject::Redirect => Redirect::temporary(FORBIDDEN_PATH).into_response(),
            OnReject::Status => {
                AppError::Forbidden("Insufficient permissions".to_string()).into_response()
            }
        };
    }

    next.run(req).await
}

/// Must run after `require_session`. Administrators never need to accept the terms.
pub async fn require_accepted_terms(
    State(gate): State<TermsGate>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(CurrentUser(user)) = req.extensions().get::<CurrentUser>() else {
        return AppError::AuthError("Authentication required".to_string()).into_response();
    };

    let exempt = user.role.is_administrator()
        || user.accepted_terms
        || TERMS_EXEMPT_PATHS.contains(&req.uri().path());

    if !exempt {
        tracing::debug!(user_id = user.id, path = req.uri().path(), "Terms not accepted");
        return match gate.on_reject {
            OnReject::Redirect => Redirect::temporary(ACCEPT_TERMS_PATH).into_response(),
            OnReject::Status => {
                AppError::Conflict("Terms of service not accepted".to_string()).into_response()
            }
        };
    }

    next.run(req).await
}

fn reject_unauthenticated(gate: &AuthGate, req: &Request<Body>) -> Response {
    match gate.on_reject {
        OnReject::Redirect => {
            let target = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            let cookie = gate.state.sessions.redirect_cookie(target);
            (
                [(header::SET_COOKIE, cookie.encoded().to_string())],
                Redirect::temporary(LOGIN_PATH),
            )
                .into_response()
        }
        OnReject::Status => {
            AppError::AuthError("Authentication required".to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Router,
        http::{HeaderValue, StatusCode},
        middleware,
        routing::get,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::Config,
        models::user::{ADMIN_ROLES, NewUser},
        store::{MemoryStore, QuizStore},
        utils::session::{REDIRECT_COOKIE, read_cookie},
    };

    async fn state_with_user(role: Role, accepted_terms: bool) -> (AppState, String) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                username: "tester".to_string(),
                password_hash: "x".to_string(),
                role,
            })
            .await
            .unwrap();
        store.set_accepted_terms(user.id, accepted_terms).await.unwrap();

        let state = AppState::new(store, Config::new("gate-secret"));
        let token = state.sessions.sign_session(user.id).unwrap();
        (state, format!("session={token}"))
    }

    fn gated(state: AppState, on_reject: OnReject, allowed: &'static [Role]) -> Router {
        Router::new()
            .route("/quiz/play", get(|| async { "play" }))
            .route("/quiz/accept-terms", get(|| async { "terms" }))
            .layer(middleware::from_fn_with_state(
                TermsGate { on_reject },
                require_accepted_terms,
            ))
            .layer(middleware::from_fn_with_state(
                RoleGate { allowed, on_reject },
                require_role,
            ))
            .layer(middleware::from_fn_with_state(
                AuthGate { state, on_reject },
                require_session,
            ))
    }

    fn request(path: &str, cookie: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().uri(path).body(Body::empty()).unwrap();
        if let Some(cookie) = cookie {
            req.headers_mut()
                .insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        req
    }

    const ALL_ROLES: &[Role] = &[Role::User, Role::QuizAdmin, Role::OrganizationAdmin];

    #[tokio::test]
    async fn missing_session_is_401_on_api_routes() {
        let (state, _) = state_with_user(Role::User, true).await;
        let app = gated(state, OnReject::Status, ALL_ROLES);

        let res = app.oneshot(request("/quiz/play", None)).await.unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_session_redirects_pages_and_remembers_target() {
        let (state, _) = state_with_user(Role::User, true).await;
        let app = gated(state, OnReject::Redirect, ALL_ROLES);

        let res = app
            .oneshot(request("/quiz/play?quiz-id=3", Some("session=garbage")))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(res.headers()[header::LOCATION], LOGIN_PATH);
        let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
        let pair = set_cookie.split(';').next().unwrap();
        let mut sent_back = axum::http::HeaderMap::new();
        sent_back.insert(header::COOKIE, HeaderValue::from_str(pair).unwrap());
        assert_eq!(
            read_cookie(&sent_back, REDIRECT_COOKIE).as_deref(),
            Some("/quiz/play?quiz-id=3")
        );
    }

    #[tokio::test]
    async fn session_of_deleted_user_is_unauthenticated() {
        let (state, cookie) = state_with_user(Role::User, true).await;
        let user = state.store.get_user_by_username("tester").await.unwrap().unwrap();
        state.store.delete_user(user.id).await.unwrap();
        let app = gated(state, OnReject::Status, ALL_ROLES);

        let res = app.oneshot(request("/quiz/play", Some(&cookie))).await.unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn insufficient_role_is_403_or_redirect() {
        let (state, cookie) = state_with_user(Role::User, true).await;

        let api = gated(state.clone(), OnReject::Status, ADMIN_ROLES);
        let res = api.oneshot(request("/quiz/play", Some(&cookie))).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let page = gated(state, OnReject::Redirect, ADMIN_ROLES);
        let res = page.oneshot(request("/quiz/play", Some(&cookie))).await.unwrap();
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(res.headers()[header::LOCATION], FORBIDDEN_PATH);
    }

    #[tokio::test]
    async fn role_is_read_fresh_on_every_request() {
        let (state, cookie) = state_with_user(Role::User, true).await;
        let app = gated(state.clone(), OnReject::Status, ADMIN_ROLES);

        let res = app.clone().oneshot(request("/quiz/play", Some(&cookie))).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        state
            .store
            .set_role_by_username("tester", Role::QuizAdmin)
            .await
            .unwrap();
        let res = app.oneshot(request("/quiz/play", Some(&cookie))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unaccepted_terms_is_409_or_redirect() {
        let (state, cookie) = state_with_user(Role::User, false).await;

        let api = gated(state.clone(), OnReject::Status, ALL_ROLES);
        let res = api.oneshot(request("/quiz/play", Some(&cookie))).await.unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let page = gated(state, OnReject::Redirect, ALL_ROLES);
        let res = page.oneshot(request("/quiz/play", Some(&cookie))).await.unwrap();
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(res.headers()[header::LOCATION], ACCEPT_TERMS_PATH);
    }

    #[tokio::test]
    async fn acceptance_route_is_exempt_from_terms() {
        let (state, cookie) = state_with_user(Role::User, false).await;
        let app = gated(state, OnReject::Redirect, ALL_ROLES);

        let res = app
            .oneshot(request("/quiz/accept-terms", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn administrators_skip_the_terms() {
        let (state, cookie) = state_with_user(Role::QuizAdmin, false).await;
        let app = gated(state, OnReject::Status, ALL_ROLES);

        let res = app.oneshot(request("/quiz/play", Some(&cookie))).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
    }
}
