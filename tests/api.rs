use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};
use std::sync::Arc;

use atlas_storefront::api;
use atlas_storefront::app_state::AppState;
use atlas_storefront::assets::{AssetError, ImageFolder, ImageStore, UploadedImage};
use atlas_storefront::cache::{LocalCache, MemoryStorage};
use atlas_storefront::clock::ManualClock;
use atlas_storefront::config::Config;
use atlas_storefront::models::{Banner, Category, Showcase};
use atlas_storefront::showcase::count_visible;
use atlas_storefront::store::{
    BANNERS, CATEGORIES, COMPANY_INFO, Document, DocumentStore, MemoryStore, SHOWCASES,
    SnapshotStream, StoreError, encode,
};
use atlas_storefront::sync::{CatalogState, LiveData, Subscriptions};
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;

struct FakeImages;

#[async_trait]
impl ImageStore for FakeImages {
    async fn upload(&self, bytes: Vec<u8>, folder: ImageFolder) -> Result<UploadedImage, AssetError> {
        Ok(UploadedImage {
            url: format!("https://img.example/{}/{}.webp", folder.as_str(), bytes.len()),
            path: format!("atlas/{}/{}", folder.as_str(), bytes.len()),
        })
    }

    async fn delete(&self, _path: &str) -> Result<(), AssetError> {
        Ok(())
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    state: AppState,
}

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()
}

fn banner(id: &str, category: Option<&str>, active: bool, order: i64) -> Banner {
    Banner {
        id: id.to_string(),
        title: format!("Баннер {}", id),
        image_url: format!("https://img.example/{}.webp", id),
        image_path: Some(format!("atlas/banners/{}", id)),
        category: category.map(str::to_string),
        active,
        order,
        ..Banner::default()
    }
}

fn category(id: &str, name: &str, order: i64) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        image_url: String::new(),
        image_path: None,
        active: true,
        order,
    }
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    store.insert(BANNERS, "b1", encode(&banner("b1", Some("Сад"), true, 0)).unwrap()).unwrap();
    store.insert(BANNERS, "b2", encode(&banner("b2", Some("Сад"), false, 1)).unwrap()).unwrap();
    store.insert(BANNERS, "b3", encode(&banner("b3", Some("Дом"), true, 2)).unwrap()).unwrap();
    store.insert(CATEGORIES, "c1", encode(&category("c1", "Сад", 0)).unwrap()).unwrap();
    store.insert(CATEGORIES, "c2", encode(&category("c2", "Дом", 1)).unwrap()).unwrap();

    let clock = Arc::new(ManualClock::new(start_time()));
    let cache = LocalCache::new(Arc::new(MemoryStorage::new()), clock.clone());
    let live = Arc::new(LiveData::activate_from_store(
        store.as_ref(),
        cache,
        std::time::Duration::from_secs(5),
    ));
    let config = Config {
        public_url: Some("https://atlas.example/".to_string()),
        autosave_idle_ms: Some(20),
        ..Config::default()
    };
    let state = AppState::new(store.clone(), Arc::new(FakeImages), live, clock.clone(), config);

    Harness { store, clock, state }
}

async fn wait_for<F>(state: &AppState, pred: F) -> CatalogState
where
    F: Fn(&CatalogState) -> bool,
{
    let mut rx = state.live.subscribe();
    let waited = tokio::time::timeout(std::time::Duration::from_secs(2), rx.wait_for(|s| pred(s)))
        .await
        .expect("live data did not reach expected state");
    waited.expect("live data stopped").clone()
}

async fn loaded(state: &AppState) -> CatalogState {
    wait_for(state, |s| !s.loading && s.banners.len() == 3 && s.categories.len() == 2).await
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(api::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn catalog_lists_visible_categories_with_active_banner_counts() {
    let h = harness();
    loaded(&h.state).await;
    let app = app!(h.state);

    let req = test::TestRequest::get().uri("/api/catalog").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["loading"], json!(false));
    let cards = body["categories"].as_array().unwrap();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0]["name"], json!("Сад"));
    assert_eq!(cards[0]["bannerCount"], json!(1));
    let banner_ids: Vec<&str> = body["banners"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap())
        .collect();
    assert_eq!(banner_ids, vec!["b1", "b3"]);
    assert_eq!(body["company"]["name"], json!("Атлас"));
}

#[actix_web::test]
async fn category_page_shows_only_active_banners() {
    let h = harness();
    loaded(&h.state).await;
    let app = app!(h.state);

    let req = test::TestRequest::get()
        .uri("/api/banners?category=%D0%A1%D0%B0%D0%B4")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["total"], json!(1));
    assert_eq!(body["items"][0]["id"], json!("b1"));
}

#[actix_web::test]
async fn saved_showcase_resolves_by_derived_slug() {
    let h = harness();
    loaded(&h.state).await;
    let app = app!(h.state);

    let req = test::TestRequest::post()
        .uri("/api/admin/showcases")
        .set_json(json!({ "name": "Весна Акции", "categories": ["Сад"] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["slug"], json!("vesna-akcii"));

    let req = test::TestRequest::get().uri("/v/vesna-akcii").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let view: Value = test::read_body_json(resp).await;

    let ids: Vec<&str> = view["banners"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["b1"]);
    assert_eq!(view["expiresOn"], json!("08.03.2026"));
}

#[actix_web::test]
async fn duplicate_slug_is_rejected_without_writing() {
    let h = harness();
    let app = app!(h.state);

    let draft = json!({ "name": "Весна Акции", "bannerIds": ["b3"] });
    let req = test::TestRequest::post().uri("/api/admin/showcases").set_json(&draft).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post().uri("/api/admin/showcases").set_json(&draft).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    assert_eq!(h.store.list(SHOWCASES).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn empty_selection_is_a_bad_request() {
    let h = harness();
    let app = app!(h.state);

    let req = test::TestRequest::post()
        .uri("/api/admin/showcases")
        .set_json(json!({ "name": "Пусто" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    assert!(h.store.list(SHOWCASES).await.unwrap().is_empty());
}

#[actix_web::test]
async fn unknown_expired_and_disabled_showcases_are_distinguished() {
    let h = harness();
    let app = app!(h.state);

    let req = test::TestRequest::get().uri("/v/nope").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], json!("Витрина не найдена"));

    let req = test::TestRequest::post()
        .uri("/api/admin/showcases")
        .set_json(json!({ "name": "Скоро", "bannerIds": ["b1"] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    let req = test::TestRequest::post()
        .uri("/api/admin/showcases")
        .set_json(json!({ "name": "Выкл", "bannerIds": ["b1"], "active": false }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get().uri("/v/vykl").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::GONE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["reason"], json!("disabled"));

    h.clock.set(start_time() + Duration::days(8));
    let req = test::TestRequest::get().uri("/v/skoro").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::GONE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["reason"], json!("expired"));
}

#[actix_web::test]
async fn admin_list_reports_status_count_and_link() {
    let h = harness();
    loaded(&h.state).await;
    let app = app!(h.state);

    let req = test::TestRequest::post()
        .uri("/api/admin/showcases")
        .set_json(json!({ "name": "Сад", "categories": ["Сад"], "bannerIds": ["b3"] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get().uri("/api/admin/showcases").to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(list[0]["status"], json!("active"));
    assert_eq!(list[0]["bannerCount"], json!(2));
    assert_eq!(list[0]["link"], json!("https://atlas.example/v/sad"));
}

#[actix_web::test]
async fn bulk_category_change_is_all_or_nothing() {
    let h = harness();
    let app = app!(h.state);

    let req = test::TestRequest::post()
        .uri("/api/admin/banners/bulk-category")
        .set_json(json!({ "ids": ["b1", "ghost"], "category": "Дом" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let b1: Banner = h.store.get(BANNERS, "b1").await.unwrap().unwrap().decode().unwrap();
    assert_eq!(b1.category.as_deref(), Some("Сад"));
}

#[actix_web::test]
async fn reorder_moves_banner_before_target() {
    let h = harness();
    loaded(&h.state).await;
    let app = app!(h.state);

    let req = test::TestRequest::post()
        .uri("/api/admin/banners/reorder")
        .set_json(json!({ "movedId": "b3", "beforeId": "b1" }))
        .to_request();
    let list: Vec<String> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list, vec!["b3", "b1", "b2"]);

    let state = wait_for(&h.state, |s| s.banners.first().is_some_and(|b| b.id == "b3")).await;
    let orders: Vec<(String, i64)> = state.banners.iter().map(|b| (b.id.clone(), b.order)).collect();
    assert_eq!(
        orders,
        vec![("b3".to_string(), 0), ("b1".to_string(), 1), ("b2".to_string(), 2)]
    );
}

#[actix_web::test]
async fn category_delete_requires_explicit_mode() {
    let h = harness();
    loaded(&h.state).await;
    let app = app!(h.state);

    let req = test::TestRequest::delete().uri("/api/admin/categories/c1").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.store.list(CATEGORIES).await.unwrap().len(), 2);

    let req = test::TestRequest::delete()
        .uri("/api/admin/categories/c1?mode=detach")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let b1: Banner = h.store.get(BANNERS, "b1").await.unwrap().unwrap().decode().unwrap();
    assert_eq!(b1.category, None);
    assert_eq!(h.store.list(CATEGORIES).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn toggle_flips_banner_visibility() {
    let h = harness();
    loaded(&h.state).await;
    let app = app!(h.state);

    let req = test::TestRequest::post().uri("/api/admin/banners/b2/toggle").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["active"], json!(true));

    let state = wait_for(&h.state, |s| s.banners.iter().all(|b| b.id != "b2" || b.active)).await;
    assert_eq!(state.banners.iter().filter(|b| b.active).count(), 3);
}

#[actix_web::test]
async fn company_autosave_is_accepted_and_written_later() {
    let h = harness();
    let app = app!(h.state);

    let req = test::TestRequest::patch()
        .uri("/api/admin/company")
        .set_json(json!({ "name": "Атлас Плюс", "phone": "+7 000" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::ACCEPTED);

    let state = wait_for(&h.state, |s| s.company.name == "Атлас Плюс").await;
    assert_eq!(state.company.phone, "+7 000");
    assert_eq!(h.store.list(COMPANY_INFO).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn image_upload_returns_hosted_location() {
    let h = harness();
    let app = app!(h.state);

    let req = test::TestRequest::post()
        .uri("/api/admin/images?folder=banners")
        .insert_header(("content-type", "application/octet-stream"))
        .set_payload(vec![1u8; 64])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["path"], json!("atlas/banners/64"));

    let req = test::TestRequest::post()
        .uri("/api/admin/images?folder=banners")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn preview_counts_each_banner_once() {
    let h = harness();
    let state = loaded(&h.state).await;
    let app = app!(h.state);

    let req = test::TestRequest::post()
        .uri("/api/admin/showcases/preview")
        .set_json(json!({ "categories": ["Сад"], "bannerIds": ["b1", "b3"] }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let ids: Vec<&str> = body["banners"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["b1", "b3"]);

    let draft = Showcase {
        id: String::new(),
        name: String::new(),
        slug: String::new(),
        categories: ["Сад".to_string()].into(),
        banner_ids: ["b1".to_string(), "b3".to_string()].into(),
        expires_at: None,
        active: true,
        created_at: None,
    };
    assert_eq!(body["count"], json!(count_visible(&draft, &state.banners)));
    assert_eq!(body["count"], json!(2));
}

type SnapshotSender = mpsc::UnboundedSender<Result<Vec<Document>, StoreError>>;

fn channel_stream() -> (SnapshotSender, SnapshotStream) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    (tx, stream::poll_fn(move |cx| rx.poll_recv(cx)).boxed())
}

#[actix_web::test]
async fn requests_wait_for_the_first_catalog_snapshot() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert(
            SHOWCASES,
            "s1",
            json!({
                "name": "V",
                "slug": "v",
                "categories": ["Сад"],
                "active": true,
                "expiresAt": start_time() + Duration::days(1)
            })
            .as_object()
            .cloned()
            .unwrap(),
        )
        .unwrap();

    let (banners_tx, banners) = channel_stream();
    let (categories_tx, categories) = channel_stream();
    let subs = Subscriptions {
        banners,
        categories,
        company: stream::pending().boxed(),
    };
    let clock = Arc::new(ManualClock::new(start_time()));
    let cache = LocalCache::new(Arc::new(MemoryStorage::new()), clock.clone());
    let live = Arc::new(LiveData::activate(subs, cache, std::time::Duration::from_secs(5)));
    assert!(live.is_loading());
    let state = AppState::new(store.clone(), Arc::new(FakeImages), live, clock, Config::default());
    let app = app!(state);

    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let b1 = Document::new("b1", encode(&banner("b1", Some("Сад"), true, 0)).unwrap());
        banners_tx.send(Ok(vec![b1])).unwrap();
        categories_tx.send(Ok(vec![])).unwrap();
    });

    let req = test::TestRequest::get().uri("/v/v").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let view: Value = test::read_body_json(resp).await;
    assert_eq!(view["banners"]["total"], json!(1));
    assert_eq!(view["banners"]["items"][0]["id"], json!("b1"));

    let req = test::TestRequest::post()
        .uri("/api/admin/banners")
        .set_json(json!({ "title": "Новый", "imageUrl": "https://img.example/new.webp" }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_str().unwrap();
    let stored: Banner = store.get(BANNERS, id).await.unwrap().unwrap().decode().unwrap();
    assert_eq!(stored.order, 1);
}
