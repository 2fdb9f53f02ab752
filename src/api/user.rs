use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use utoipa::ToSchema;

use crate::account;
use crate::plan::schedule::Item;
use crate::planner::{LinkPreview, Planner};
use crate::store::SqlitePlanStore;

use super::status_for;

pub type SharedPlanner = Arc<Planner<SqlitePlanStore>>;

const SESSION_ACCOUNT_KEY: &str = "account_id";
const SESSION_ITEMS_KEY: &str = "pending_items";

#[derive(Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
}

#[utoipa::path(
    context_path = "/api/planner",
    path = "/create_user",
    method(post),
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "Account created"),
        (status = 400, description = "Invalid registration")
    )
)]
pub async fn create_user(
    State(planner): State<SharedPlanner>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    match account::create_account(&planner.pool, &req.email, &req.password).await {
        Ok(_) => "User registered successfully".into_response(),
        Err(e) => (status_for(&e), e.to_string()).into_response(),
    }
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[utoipa::path(
    context_path = "/api/planner",
    path = "/login",
    method(post),
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful"),
        (status = 403, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(planner): State<SharedPlanner>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    match account::login(&planner.pool, &req.email, &req.password).await {
        Ok(id) => match session.insert(SESSION_ACCOUNT_KEY, id).await {
            Ok(()) => "Login successful".into_response(),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        },
        Err(e) => (status_for(&e), e.to_string()).into_response(),
    }
}

#[utoipa::path(
    context_path = "/api/planner",
    path = "/logout",
    method(post),
    responses((status = 200, description = "Logout successful"))
)]
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.delete().await;
    "Logout successful".into_response()
}

#[utoipa::path(
    context_path = "/api/planner",
    path = "/user_info",
    method(get),
    responses(
        (status = 200, description = "Account details", body = account::AccountInfo),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn user_info(State(planner): State<SharedPlanner>, session: Session) -> impl IntoResponse {
    let Ok(Some(account_id)) = session.get::<i64>(SESSION_ACCOUNT_KEY).await else {
        return (StatusCode::UNAUTHORIZED, ()).into_response();
    };
    match account::account_info(&planner.pool, account_id).await {
        Ok(info) => Json(info).into_response(),
        Err(e) => (status_for(&e), e.to_string()).into_response(),
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitLinkRequest {
    pub url: String,
}

#[utoipa::path(
    context_path = "/api/planner",
    path = "/submit_link",
    method(post),
    request_body = SubmitLinkRequest,
    responses(
        (status = 200, description = "Link resolved", body = LinkPreview),
        (status = 400, description = "Unparseable link"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Catalog unavailable")
    )
)]
pub async fn submit_link(
    State(planner): State<SharedPlanner>,
    session: Session,
    Json(req): Json<SubmitLinkRequest>,
) -> impl IntoResponse {
    let Ok(Some(_)) = session.get::<i64>(SESSION_ACCOUNT_KEY).await else {
        return (StatusCode::UNAUTHORIZED, ()).into_response();
    };
    match planner.submit_link(&req.url).await {
        Ok(items) => {
            let preview = LinkPreview::new(&items);
            match session.insert(SESSION_ITEMS_KEY, &items).await {
                Ok(()) => Json(preview).into_response(),
                Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
            }
        }
        Err(e) => (status_for(&e), e.to_string()).into_response(),
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SavePlanRequest {
    /// Number of days to spread the fetched videos over.
    pub days: u32,
}

#[utoipa::path(
    context_path = "/api/planner",
    path = "/save_plan",
    method(post),
    request_body = SavePlanRequest,
    responses(
        (status = 200, description = "Study plan saved"),
        (status = 400, description = "No submitted link or invalid day count"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn save_plan(
    State(planner): State<SharedPlanner>,
    session: Session,
    Json(req): Json<SavePlanRequest>,
) -> impl IntoResponse {
    let Ok(Some(account_id)) = session.get::<i64>(SESSION_ACCOUNT_KEY).await else {
        return (StatusCode::UNAUTHORIZED, ()).into_response();
    };
    let Ok(Some(items)) = session.get::<Vec<Item>>(SESSION_ITEMS_KEY).await else {
        return (
            StatusCode::BAD_REQUEST,
            "submit a link before saving a plan",
        )
            .into_response();
    };
    match planner.save_plan(account_id, &items, req.days).await {
        Ok(_) => "Study plan saved".into_response(),
        Err(e) => (status_for(&e), e.to_string()).into_response(),
    }
}

#[utoipa::path(
    context_path = "/api/planner",
    path = "/today",
    method(get),
    responses(
        (status = 200, description = "Current day", body = crate::planner::DayView),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No active study plan")
    )
)]
pub async fn today(State(planner): State<SharedPlanner>, session: Session) -> impl IntoResponse {
    let Ok(Some(account_id)) = session.get::<i64>(SESSION_ACCOUNT_KEY).await else {
        return (StatusCode::UNAUTHORIZED, ()).into_response();
    };
    match planner.today(account_id).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => (status_for(&e), e.to_string()).into_response(),
    }
}

#[utoipa::path(
    context_path = "/api/planner",
    path = "/overview",
    method(get),
    responses(
        (status = 200, description = "Plan overview", body = crate::planner::PlanOverview),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No active study plan")
    )
)]
pub async fn overview(State(planner): State<SharedPlanner>, session: Session) -> impl IntoResponse {
    let Ok(Some(account_id)) = session.get::<i64>(SESSION_ACCOUNT_KEY).await else {
        return (StatusCode::UNAUTHORIZED, ()).into_response();
    };
    match planner.overview(account_id).await {
        Ok(overview) => Json(overview).into_response(),
        Err(e) => (status_for(&e), e.to_string()).into_response(),
    }
}

#[derive(Deserialize, ToSchema)]
pub struct MarkWatchedRequest {
    pub day: u32,
    /// Zero-based index into the day's bucket.
    pub index: usize,
}

#[utoipa::path(
    context_path = "/api/planner",
    path = "/mark_watched",
    method(post),
    request_body = MarkWatchedRequest,
    responses(
        (status = 200, description = "Updated day", body = crate::planner::DayView),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Day still locked"),
        (status = 404, description = "No such day")
    )
)]
pub async fn mark_watched(
    State(planner): State<SharedPlanner>,
    session: Session,
    Json(req): Json<MarkWatchedRequest>,
) -> impl IntoResponse {
    let Ok(Some(account_id)) = session.get::<i64>(SESSION_ACCOUNT_KEY).await else {
        return (StatusCode::UNAUTHORIZED, ()).into_response();
    };
    match planner.mark_watched(account_id, req.day, req.index).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => (status_for(&e), e.to_string()).into_response(),
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ViewDayRequest {
    pub day: u32,
}

#[utoipa::path(
    context_path = "/api/planner",
    path = "/view_day",
    method(post),
    request_body = ViewDayRequest,
    responses(
        (status = 200, description = "Opened day", body = crate::planner::DayView),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Day still locked")
    )
)]
pub async fn view_day(
    State(planner): State<SharedPlanner>,
    session: Session,
    Json(req): Json<ViewDayRequest>,
) -> impl IntoResponse {
    let Ok(Some(account_id)) = session.get::<i64>(SESSION_ACCOUNT_KEY).await else {
        return (StatusCode::UNAUTHORIZED, ()).into_response();
    };
    match planner.view_day(account_id, req.day).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => (status_for(&e), e.to_string()).into_response(),
    }
}

#[utoipa::path(
    context_path = "/api/planner",
    path = "/reset_progress",
    method(post),
    responses(
        (status = 200, description = "Progress cleared"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No active study plan")
    )
)]
pub async fn reset_progress(
    State(planner): State<SharedPlanner>,
    session: Session,
) -> impl IntoResponse {
    let Ok(Some(account_id)) = session.get::<i64>(SESSION_ACCOUNT_KEY).await else {
        return (StatusCode::UNAUTHORIZED, ()).into_response();
    };
    match planner.reset_progress(account_id).await {
        Ok(()) => "Study plan progress reset successfully".into_response(),
        Err(e) => (status_for(&e), e.to_string()).into_response(),
    }
}

#[utoipa::path(
    context_path = "/api/planner",
    path = "/delete_plan",
    method(post),
    responses(
        (status = 200, description = "Plan deleted"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn delete_plan(
    State(planner): State<SharedPlanner>,
    session: Session,
) -> impl IntoResponse {
    let Ok(Some(account_id)) = session.get::<i64>(SESSION_ACCOUNT_KEY).await else {
        return (StatusCode::UNAUTHORIZED, ()).into_response();
    };
    match planner.delete_plan(account_id).await {
        Ok(()) => "Study plan deleted successfully".into_response(),
        Err(e) => (status_for(&e), e.to_string()).into_response(),
    }
}

#[utoipa::path(
    context_path = "/api/planner",
    path = "/material/{day}",
    method(get),
    params(("day" = u32, Path, description = "Day number to build material for")),
    responses(
        (status = 200, description = "Day study document, markdown"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Day still locked"),
        (status = 404, description = "No such day")
    )
)]
pub async fn day_material(
    State(planner): State<SharedPlanner>,
    session: Session,
    Path(day): Path<u32>,
) -> impl IntoResponse {
    let Ok(Some(account_id)) = session.get::<i64>(SESSION_ACCOUNT_KEY).await else {
        return (StatusCode::UNAUTHORIZED, ()).into_response();
    };
    match planner.day_material(account_id, day).await {
        Ok(document) => (
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            document,
        )
            .into_response(),
        Err(e) => (status_for(&e), e.to_string()).into_response(),
    }
}

pub fn get_planner_scope() -> Router<SharedPlanner> {
    Router::new().nest(
        "/planner",
        Router::new()
            .route("/create_user", post(create_user))
            .route("/login", post(login))
            .route("/logout", post(logout))
            .route("/user_info", get(user_info))
            .route("/submit_link", post(submit_link))
            .route("/save_plan", post(save_plan))
            .route("/today", get(today))
            .route("/overview", get(overview))
            .route("/mark_watched", post(mark_watched))
            .route("/view_day", post(view_day))
            .route("/reset_progress", post(reset_progress))
            .route("/delete_plan", post(delete_plan))
            .route("/material/{day}", get(day_material)),
    )
}
