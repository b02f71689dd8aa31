use crate::config::RoutingTable;
use crate::error::AppError;
use crate::services::dashboard as service;
use crate::store::SharedStore;
use ntex::web::{self, HttpResponse};
use std::sync::Arc;

pub async fn list_regions(
    routing: web::types::State<Arc<RoutingTable>>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(&service::list_regions(&routing)))
}

pub async fn get_region(
    store: web::types::State<SharedStore>,
    routing: web::types::State<Arc<RoutingTable>>,
    path: web::types::Path<String>,
) -> Result<HttpResponse, AppError> {
    let code = path.into_inner();
    let body = service::region_document(&**store, &routing, &code)?;
    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}
