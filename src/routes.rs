// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, header},
    middleware::from_fn_with_state,
    response::Redirect,
    routing::{delete, get, post, put},
};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, guest, organization_admin, quiz, quiz_api},
    middleware::{
        AuthGate, OnReject, RoleGate, TermsGate, require_accepted_terms, require_role,
        require_session,
    },
    models::user::{ADMIN_ROLES, ORGANIZATION_ADMIN_ROLES},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Browser pages (`/quiz`, `/dashboard`) redirect when a gate says no.
/// * API routes (`/api/v1`) answer with 401 / 403 / 409 instead.
/// * Guest routes (`/api/v1/guest`) need no session and store nothing.
/// * Gates run session first, then role, then terms.
///
/// Routes are registered with their full paths so the terms gate can see
/// which path was requested.
pub fn create_router(state: AppState) -> Router {
    let csp = HeaderValue::from_str(&state.config.content_security_policy()).unwrap_or_else(|e| {
        tracing::warn!("Invalid ALLOWED_FRAME_ANCESTORS, using default policy: {}", e);
        HeaderValue::from_static("frame-ancestors 'self'")
    });

    let page_session = from_fn_with_state(
        AuthGate {
            state: state.clone(),
            on_reject: OnReject::Redirect,
        },
        require_session,
    );
    let api_session = from_fn_with_state(
        AuthGate {
            state: state.clone(),
            on_reject: OnReject::Status,
        },
        require_session,
    );

    let public_routes = Router::new()
        .route("/", get(|| async { Redirect::temporary("/quiz") }))
        .route("/login", get(auth::login_page))
        .route("/forbidden", get(auth::forbidden_page))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout));

    let guest_routes = Router::new()
        .route("/api/v1/guest/quiz", get(guest::open_quiz))
        .route("/api/v1/guest/question", get(guest::question))
        .route("/api/v1/guest/user-answer", post(guest::user_answer))
        .route("/api/v1/guest/generate-summary", post(guest::generate_summary));

    let quiz_pages = Router::new()
        .route("/quiz", get(quiz::list_open_quizzes))
        .route("/quiz/play", get(quiz::play))
        .route("/quiz/summary", get(quiz::summary))
        .route("/quiz/toppliste", get(quiz::toppliste))
        .route("/quiz/profile", get(quiz::profile))
        .route("/quiz/accept-terms", get(quiz::accept_terms_page))
        // Applied from the inside out: session, then terms
        .layer(from_fn_with_state(
            TermsGate {
                on_reject: OnReject::Redirect,
            },
            require_accepted_terms,
        ))
        .layer(page_session.clone());

    let dashboard_pages = Router::new()
        .route("/dashboard/leaderboard", get(admin::dashboard_leaderboard))
        .layer(from_fn_with_state(
            RoleGate {
                allowed: ADMIN_ROLES,
                on_reject: OnReject::Redirect,
            },
            require_role,
        ))
        .layer(page_session);

    let quiz_api_routes = Router::new()
        .route("/api/v1/quiz/next-question", get(quiz_api::next_question))
        .route("/api/v1/quiz/user-answer", post(quiz_api::user_answer))
        .route("/api/v1/quiz/accept-terms", post(quiz_api::accept_terms))
        .route("/api/v1/quiz/participation", post(quiz_api::toggle_participation))
        .route("/api/v1/quiz/profile", delete(quiz_api::delete_profile))
        .layer(from_fn_with_state(
            TermsGate {
                on_reject: OnReject::Status,
            },
            require_accepted_terms,
        ))
        .layer(api_session.clone());

    let admin_routes = Router::new()
        .route(
            "/api/v1/admin/quizzes",
            get(admin::list_quizzes).post(admin::create_quiz),
        )
        .route(
            "/api/v1/admin/quizzes/{id}",
            get(admin::get_quiz)
                .put(admin::update_quiz)
                .delete(admin::delete_quiz),
        )
        .route("/api/v1/admin/quizzes/{id}/questions", post(admin::create_question))
        .route(
            "/api/v1/admin/quizzes/{id}/arrangement",
            put(admin::rearrange_questions),
        )
        .route(
            "/api/v1/admin/quizzes/{id}/labels/{label_id}",
            post(admin::attach_label).delete(admin::detach_label),
        )
        .route(
            "/api/v1/admin/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route(
            "/api/v1/admin/labels",
            get(admin::list_labels).post(admin::create_label),
        )
        .route("/api/v1/admin/labels/{id}", delete(admin::delete_label))
        .route(
            "/api/v1/admin/articles",
            get(admin::list_articles).post(admin::create_article),
        )
        // Double middleware protection: session first, then role check
        .layer(from_fn_with_state(
            RoleGate {
                allowed: ADMIN_ROLES,
                on_reject: OnReject::Status,
            },
            require_role,
        ))
        .layer(api_session.clone());

    let organization_admin_routes = Router::new()
        .route(
            "/api/v1/organization-admin/users",
            get(organization_admin::list_users),
        )
        .route(
            "/api/v1/organization-admin/role",
            put(organization_admin::set_role),
        )
        .layer(from_fn_with_state(
            RoleGate {
                allowed: ORGANIZATION_ADMIN_ROLES,
                on_reject: OnReject::Status,
            },
            require_role,
        ))
        .layer(api_session);

    Router::new()
        .merge(public_routes)
        .merge(guest_routes)
        .merge(quiz_pages)
        .merge(dashboard_pages)
        .merge(quiz_api_routes)
        .merge(admin_routes)
        .merge(organization_admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp,
        ))
        .with_state(state)
}
