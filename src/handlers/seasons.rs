use crate::error::AppError;
use crate::services::dashboard as service;
use crate::store::SharedStore;
use ntex::web::{self, HttpResponse};

pub async fn get_seasons(
    store: web::types::State<SharedStore>,
) -> Result<HttpResponse, AppError> {
    let seasons = service::seasons(&**store)?;
    Ok(HttpResponse::Ok().json(&seasons))
}

pub async fn get_manifest(
    store: web::types::State<SharedStore>,
    path: web::types::Path<String>,
) -> Result<HttpResponse, AppError> {
    let archive = path.into_inner();
    let manifest = service::manifest(&**store, &archive)?;
    Ok(HttpResponse::Ok().json(&manifest))
}

pub async fn get_archived_region(
    store: web::types::State<SharedStore>,
    path: web::types::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (archive, code) = path.into_inner();
    let body = service::archived_document(&**store, &archive, &code)?;
    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}
