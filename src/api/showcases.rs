use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::helpers::{BannerPage, PageQuery, live_catalog, paginate};
use crate::{
    app_state::AppState,
    errors::AppError,
    models::{Banner, Showcase, Visibility},
    showcase::{ShowcaseDraft, count_visible, resolve_banners, resolve_by_slug, visibility_status},
};

const NOT_FOUND_MESSAGE: &str = "Витрина не найдена";
const EXPIRED_MESSAGE: &str = "Срок действия этой витрины истёк";
const DISABLED_MESSAGE: &str = "Эта витрина временно недоступна";

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShowcaseView {
    pub name: String,
    pub slug: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// Дата окончания в часовом поясе магазина, `дд.мм.гггг`
    pub expires_on: Option<String>,
    pub banners: BannerPage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    NotFound,
    Expired,
    Disabled,
}

impl UnavailableReason {
    fn message(&self) -> &'static str {
        match self {
            UnavailableReason::NotFound => NOT_FOUND_MESSAGE,
            UnavailableReason::Expired => EXPIRED_MESSAGE,
            UnavailableReason::Disabled => DISABLED_MESSAGE,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ShowcaseUnavailable {
    pub reason: UnavailableReason,
    pub message: String,
}

impl From<UnavailableReason> for ShowcaseUnavailable {
    fn from(reason: UnavailableReason) -> Self {
        Self {
            reason,
            message: reason.message().to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShowcaseSummary {
    #[serde(flatten)]
    pub showcase: Showcase,
    pub status: Visibility,
    pub status_label: String,
    pub banner_count: usize,
    pub link: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ShowcasePreview {
    pub count: usize,
    pub banners: Vec<Banner>,
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ShowcaseUnavailable::from(UnavailableReason::NotFound))
}

#[utoipa::path(
    get,
    path = "/v/{slug}",
    tag = "Showcases",
    params(
        ("slug" = String, Path, description = "Showcase address"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Showcase banners", body = ShowcaseView),
        (status = 404, description = "Showcase not found", body = ShowcaseUnavailable),
        (status = 410, description = "Showcase expired or disabled", body = ShowcaseUnavailable)
    )
)]
#[get("/v/{slug}")]
pub async fn view_showcase(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let slug = path.into_inner();

    let showcase = match resolve_by_slug(data.store.as_ref(), &slug).await {
        Ok(Some(showcase)) => showcase,
        Ok(None) => return Ok(not_found()),
        Err(e) => {
            log::error!("Failed to load showcase '{}': {}", slug, e);
            return Ok(not_found());
        }
    };

    let reason = match visibility_status(&showcase, data.clock.now()) {
        Visibility::Active => None,
        Visibility::Expired => Some(UnavailableReason::Expired),
        Visibility::Disabled => Some(UnavailableReason::Disabled),
    };
    if let Some(reason) = reason {
        return Ok(HttpResponse::Gone().json(ShowcaseUnavailable::from(reason)));
    }

    let state = live_catalog(&data).await;
    let banners = resolve_banners(&showcase, &state.banners);
    let expires_on = showcase
        .expires_at
        .map(|at| at.with_timezone(&data.timezone).format("%d.%m.%Y").to_string());

    Ok(HttpResponse::Ok().json(ShowcaseView {
        name: showcase.name,
        slug: showcase.slug,
        expires_at: showcase.expires_at,
        expires_on,
        banners: paginate(banners, query.page),
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/showcases",
    tag = "Showcases",
    responses(
        (status = 200, description = "All showcases, newest first", body = [ShowcaseSummary])
    )
)]
#[get("")]
pub async fn list_showcases(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let showcases = data.showcases.list().await?;
    let state = live_catalog(&data).await;
    let now = data.clock.now();

    let summaries: Vec<ShowcaseSummary> = showcases
        .into_iter()
        .map(|showcase| {
            let status = visibility_status(&showcase, now);
            ShowcaseSummary {
                status,
                status_label: status.label().to_string(),
                banner_count: count_visible(&showcase, &state.banners),
                link: data.config.showcase_link(&showcase.slug),
                showcase,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(summaries))
}

#[utoipa::path(
    post,
    path = "/api/admin/showcases",
    tag = "Showcases",
    request_body = ShowcaseDraft,
    responses(
        (status = 201, description = "Showcase created", body = Showcase),
        (status = 400, description = "Invalid draft"),
        (status = 409, description = "Slug already taken")
    )
)]
#[post("")]
pub async fn create_showcase(
    data: web::Data<AppState>,
    body: web::Json<ShowcaseDraft>,
) -> Result<HttpResponse, AppError> {
    let mut draft = body.into_inner();
    draft.id = None;
    let showcase = data.showcases.save(&draft).await?;
    Ok(HttpResponse::Created().json(showcase))
}

#[utoipa::path(
    put,
    path = "/api/admin/showcases/{id}",
    tag = "Showcases",
    params(
        ("id" = String, Path, description = "Showcase ID")
    ),
    request_body = ShowcaseDraft,
    responses(
        (status = 200, description = "Showcase updated", body = Showcase),
        (status = 400, description = "Invalid draft"),
        (status = 404, description = "Showcase not found"),
        (status = 409, description = "Slug already taken")
    )
)]
#[put("/{id}")]
pub async fn update_showcase(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ShowcaseDraft>,
) -> Result<HttpResponse, AppError> {
    let mut draft = body.into_inner();
    draft.id = Some(path.into_inner());
    let showcase = data.showcases.save(&draft).await?;
    Ok(HttpResponse::Ok().json(showcase))
}

#[utoipa::path(
    delete,
    path = "/api/admin/showcases/{id}",
    tag = "Showcases",
    params(
        ("id" = String, Path, description = "Showcase ID")
    ),
    responses(
        (status = 204, description = "Showcase deleted")
    )
)]
#[delete("/{id}")]
pub async fn delete_showcase(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    data.showcases.delete(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Предпросмотр выбора до сохранения.
#[utoipa::path(
    post,
    path = "/api/admin/showcases/preview",
    tag = "Showcases",
    request_body = ShowcaseDraft,
    responses(
        (status = 200, description = "Banners the draft would show", body = ShowcasePreview)
    )
)]
#[post("/preview")]
pub async fn preview_showcase(
    data: web::Data<AppState>,
    body: web::Json<ShowcaseDraft>,
) -> Result<HttpResponse, AppError> {
    let draft = body.into_inner();
    let probe = Showcase {
        id: String::new(),
        name: draft.name,
        slug: String::new(),
        categories: draft.categories,
        banner_ids: draft.banner_ids,
        expires_at: draft.expires_at,
        active: true,
        created_at: None,
    };
    let state = live_catalog(&data).await;
    let banners = resolve_banners(&probe, &state.banners);
    Ok(HttpResponse::Ok().json(ShowcasePreview {
        count: banners.len(),
        banners,
    }))
}

pub fn init_public_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(view_showcase);
}

pub fn init_admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/showcases")
            .service(list_showcases)
            .service(preview_showcase)
            .service(create_showcase)
            .service(update_showcase)
            .service(delete_showcase),
    );
}
