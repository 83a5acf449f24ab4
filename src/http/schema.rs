use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use futures_util::TryStreamExt;
use serde::Serialize;

use super::{require_admin, Service};
use crate::error::{Error, Result};
use crate::schema::SchemaConf;

#[derive(Serialize)]
struct IndexAck {
    code: u16,
    msg: &'static str,
    index: String,
}

#[get("/schema/{index}")]
pub async fn get_schema(service: Service, index: web::Path<String>) -> Result<HttpResponse> {
    let conf = service.get_schema(&index)?;
    Ok(HttpResponse::Ok().json(conf))
}

/// `POST /schema/:index` (§6): either a JSON body or `multipart/form-data` carrying the schema
/// JSON as an uploaded `file` field — mirroring `rest/schema.go`'s `CreateSchema`, which reads
/// the schema content from either source via `getReader` and saves it verbatim.
#[post("/schema/{index}")]
pub async fn create_schema(
    req: HttpRequest,
    service: Service,
    index: web::Path<String>,
    payload: web::Payload,
) -> Result<HttpResponse> {
    require_admin(&req, &service)?;

    let content_type = req
        .headers()
        .get(actix_web::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let bytes = if content_type.starts_with("multipart/form-data") {
        read_multipart_schema(&req, payload).await?
    } else {
        read_payload(payload).await?
    };

    let mut conf: SchemaConf = serde_json::from_slice(&bytes)
        .map_err(|e| Error::BadRequest(format!("invalid schema JSON: {e}")))?;
    conf.name = index.into_inner();
    service.create_schema(conf.clone())?;
    Ok(HttpResponse::Ok().json(IndexAck { code: 200, msg: "schema created", index: conf.name }))
}

async fn read_payload(mut payload: web::Payload) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = payload.try_next().await.map_err(|e| Error::BadRequest(e.to_string()))? {
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

async fn read_multipart_schema(req: &HttpRequest, payload: web::Payload) -> Result<Vec<u8>> {
    let mut multipart = Multipart::new(req.headers(), payload);
    let mut field = multipart
        .try_next()
        .await
        .map_err(|e| Error::BadRequest(e.to_string()))?
        .ok_or_else(|| Error::BadRequest("missing multipart file field".to_string()))?;

    let mut buf = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(|e| Error::BadRequest(e.to_string()))? {
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

#[delete("/schema/{index}")]
pub async fn delete_schema(
    req: HttpRequest,
    service: Service,
    index: web::Path<String>,
) -> Result<HttpResponse> {
    require_admin(&req, &service)?;
    service.delete_schema(&index)?;
    Ok(HttpResponse::Ok().json(IndexAck { code: 200, msg: "schema deleted", index: index.into_inner() }))
}

#[put("/schema/{index}/{new_index}")]
pub async fn rename_schema(
    req: HttpRequest,
    service: Service,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    require_admin(&req, &service)?;
    let (old, new) = path.into_inner();
    service.rename_schema(&old, &new)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "code": 200, "msg": "schema renamed" })))
}
