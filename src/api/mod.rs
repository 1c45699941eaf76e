pub mod banners;
pub mod categories;
pub mod company;
pub mod helpers;
pub mod images;
pub mod showcases;
pub mod storefront;

use actix_web::web;

/// Регистрирует все маршруты сервиса.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(storefront::init_routes)
            .service(
                web::scope("/admin")
                    .configure(banners::init_routes)
                    .configure(categories::init_routes)
                    .configure(showcases::init_admin_routes)
                    .configure(company::init_routes)
                    .configure(images::init_routes),
            ),
    )
    .configure(showcases::init_public_routes);
}
