use actix_web::{delete, put, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{require_admin, Service};
use crate::document::{stringify_id, RawDoc};
use crate::error::Result;

#[derive(Serialize)]
struct DocAck {
    code: u16,
    msg: &'static str,
    id: String,
}

#[derive(Serialize)]
struct DocsAck {
    code: u16,
    msg: &'static str,
    ids: Vec<String>,
}

#[derive(Deserialize)]
struct DeleteOneReq {
    id: Value,
}

#[put("/doc/{index}")]
pub async fn index_doc(
    req: HttpRequest,
    service: Service,
    index: web::Path<String>,
    body: web::Json<RawDoc>,
) -> Result<HttpResponse> {
    require_admin(&req, &service)?;
    let id = service.index_doc(&index, &body)?;
    Ok(HttpResponse::Ok().json(DocAck { code: 200, msg: "document indexed", id }))
}

#[put("/update/{index}")]
pub async fn update_doc(
    req: HttpRequest,
    service: Service,
    index: web::Path<String>,
    body: web::Json<RawDoc>,
) -> Result<HttpResponse> {
    require_admin(&req, &service)?;
    let id = service.update_doc(&index, &body)?;
    Ok(HttpResponse::Ok().json(DocAck { code: 200, msg: "document updated", id }))
}

#[delete("/doc/{index}")]
pub async fn delete_doc(
    req: HttpRequest,
    service: Service,
    index: web::Path<String>,
    body: web::Json<DeleteOneReq>,
) -> Result<HttpResponse> {
    require_admin(&req, &service)?;
    let id = stringify_id(&body.id)?;
    service.delete_doc(&index, &id)?;
    Ok(HttpResponse::Ok().json(DocAck { code: 200, msg: "document deleted", id }))
}

#[delete("/docs/{index}")]
pub async fn delete_docs(
    req: HttpRequest,
    service: Service,
    index: web::Path<String>,
    body: web::Json<Vec<Value>>,
) -> Result<HttpResponse> {
    require_admin(&req, &service)?;
    let ids = body
        .into_inner()
        .iter()
        .map(stringify_id)
        .collect::<Result<Vec<String>>>()?;
    service.delete_docs(&index, &ids)?;
    Ok(HttpResponse::Ok().json(DocsAck { code: 200, msg: "documents deleted", ids }))
}
