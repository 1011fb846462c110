// src/routes.rs

use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use crate::error::ApiError;
use crate::lists::{create_list, delete_list, get_list, list_lists, update_list};
use crate::tasks::{create_task, delete_task, list_tasks, update_task};
use crate::validation::ValidationError;

/// Mounts the whole API under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(path_config())
            .route("/health", web::get().to(health))
            // LISTS
            .service(
                web::scope("/lists")
                    .route("", web::get().to(list_lists))
                    .route("", web::post().to(create_list))
                    .route("/{id}", web::get().to(get_list))
                    .route("/{id}", web::put().to(update_list))
                    .route("/{id}", web::delete().to(delete_list))
                    .route("/{list_id}/tasks", web::get().to(list_tasks))
                    .route("/{list_id}/tasks", web::post().to(create_task)),
            )
            // TASKS
            .service(
                web::scope("/tasks")
                    .route("/{id}", web::put().to(update_task))
                    .route("/{id}", web::delete().to(delete_task)),
            ),
    );
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|_err, _req| {
        ApiError::from(ValidationError::for_field("id", "id must be an integer")).into()
    })
}
