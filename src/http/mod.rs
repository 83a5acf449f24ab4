//! HTTP surface (§4.11, C9): thin `actix-web` handlers mapping 1:1 onto `IndexService`'s
//! programmatic operations. Handlers parse path/query/body, call the core, and map
//! `Result<_, Error>` to a JSON response via `Error`'s `ResponseError` impl.

mod docs;
mod document;
mod health;
mod schema;
mod search;

use std::sync::Arc;

use actix_web::{web, HttpRequest};

use crate::error::{Error, Result};
use crate::service::IndexService;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(schema::get_schema)
        .service(schema::create_schema)
        .service(schema::delete_schema)
        .service(schema::rename_schema)
        .service(document::index_doc)
        .service(document::update_doc)
        .service(document::delete_doc)
        .service(document::delete_docs)
        .service(docs::bulk_ingest)
        .service(search::search);
}

/// §4.11: an optional bearer-token gate on mutating requests. `GET /health` and
/// `GET /search/:index` never call this. Returns `Ok(())` when no token is configured.
fn require_admin(req: &HttpRequest, service: &IndexService) -> Result<()> {
    let Some(expected) = service.config().admin_token.as_deref() else {
        return Ok(());
    };
    let provided = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if provided == Some(expected) {
        Ok(())
    } else {
        Err(Error::Unauthorized)
    }
}

pub(crate) type Service = web::Data<Arc<IndexService>>;

#[cfg(test)]
mod tests {
    use actix_web::{test, web, App};
    use serde_json::json;
    use tempfile::tempdir;

    use super::configure;
    use crate::config::ServiceConfig;
    use crate::service::IndexService;

    fn test_service(dir: &std::path::Path) -> std::sync::Arc<IndexService> {
        IndexService::new(ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            worker_num: 2,
            lru_minutes: 0,
            lru_capacity: 20,
            root_dir: dir.join("root"),
            schema_dir: dir.join("schemas"),
            store_engine: None,
            admin_token: None,
        })
    }

    #[actix_web::test]
    async fn health_check_returns_ok() {
        let dir = tempdir().unwrap();
        let service = test_service(dir.path());
        let app = test::init_service(
            App::new().app_data(web::Data::new(service)).configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "OK\n");
    }

    #[actix_web::test]
    async fn create_schema_then_index_then_search() {
        let dir = tempdir().unwrap();
        let service = test_service(dir.path());
        let app = test::init_service(
            App::new().app_data(web::Data::new(service)).configure(configure),
        )
        .await;

        let schema = json!({
            "name": "books",
            "fields": [
                { "name": "id", "type": "integer", "pk": true, "tokenizer": "NONE" },
                { "name": "title", "type": "string", "tokenizer": "WHITESPACE" }
            ]
        });
        let req = test::TestRequest::post().uri("/schema/books").set_json(&schema).to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let doc = json!({ "id": 7, "title": "Hello World" });
        let req = test::TestRequest::put().uri("/doc/books").set_json(&doc).to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::get().uri("/search/books?q=Hello").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["hits"][0]["id"], "7");
    }
}
