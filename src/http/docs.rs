use std::io::Cursor;

use actix_multipart::Multipart;
use actix_web::{put, web, HttpRequest, HttpResponse};
use futures_util::TryStreamExt;
use serde::Deserialize;

use super::{require_admin, Service};
use crate::bulk::{self, BulkOutcome};
use crate::error::{Error, Result};

#[derive(Deserialize)]
pub struct CbQuery {
    cb: Option<String>,
}

/// `PUT /docs/:index?cb=<url>` (§6): content-type dispatch between a JSON array, JSON-lines,
/// CSV, and `multipart/form-data` (extension-based on the uploaded file name).
#[put("/docs/{index}")]
pub async fn bulk_ingest(
    req: HttpRequest,
    service: Service,
    index: web::Path<String>,
    query: web::Query<CbQuery>,
    mut payload: web::Payload,
) -> Result<HttpResponse> {
    require_admin(&req, &service)?;

    let content_type = req
        .headers()
        .get(actix_web::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let (kind, bytes) = if content_type.starts_with("multipart/form-data") {
        read_multipart_file(&req, payload).await?
    } else {
        let main_type = content_type.split(';').next().unwrap_or("").trim();
        let kind = bulk::dispatch_for_content_type(main_type)
            .ok_or_else(|| Error::BadRequest(format!("unsupported content type `{main_type}`")))?;
        let mut buf = Vec::new();
        while let Some(chunk) = payload.try_next().await.map_err(|e| Error::BadRequest(e.to_string()))? {
            buf.extend_from_slice(&chunk);
        }
        (kind, buf)
    };

    let outcome =
        service.index_stream(&index, kind, Cursor::new(bytes), query.into_inner().cb)?;

    match outcome {
        BulkOutcome::Sync(ids) => {
            Ok(HttpResponse::Ok().json(serde_json::json!({ "code": 200, "msg": "bulk ingest complete", "ids": ids })))
        }
        BulkOutcome::Dispatched => {
            Ok(HttpResponse::Accepted().json(serde_json::json!({ "code": 202, "msg": "bulk ingest dispatched" })))
        }
    }
}

async fn read_multipart_file(
    req: &HttpRequest,
    payload: web::Payload,
) -> Result<(crate::generators::DocKind, Vec<u8>)> {
    let mut multipart = Multipart::new(req.headers(), payload);
    let mut field = multipart
        .try_next()
        .await
        .map_err(|e| Error::BadRequest(e.to_string()))?
        .ok_or_else(|| Error::BadRequest("missing multipart file field".to_string()))?;

    let filename = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .unwrap_or("")
        .to_string();
    let kind = bulk::dispatch_for_filename(&filename);

    let mut buf = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(|e| Error::BadRequest(e.to_string()))? {
        buf.extend_from_slice(&chunk);
    }
    Ok((kind, buf))
}
