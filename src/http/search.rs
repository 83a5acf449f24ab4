use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use super::Service;
use crate::engine::SearchQuery;
use crate::error::Result;
use crate::tokenizer;

#[derive(Deserialize)]
pub struct SearchParams {
    q: String,
    #[serde(default)]
    limit: usize,
    /// Optional field name to scope the search to, using the `f{idx}:` qualified postings
    /// built by the indexing core (§4.7.1).
    field: Option<String>,
}

#[get("/search/{index}")]
pub async fn search(
    service: Service,
    index: web::Path<String>,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse> {
    let mut tokens = tokenizer::whitespace_tokenize(&params.q);
    if let Some(field) = &params.field {
        if let Ok(conf) = service.get_schema(&index) {
            if let Some(pos) = conf.fields.iter().position(|f| &f.name == field) {
                tokens = tokens.into_iter().map(|t| format!("f{pos}:{t}")).collect();
            }
        }
    }

    let result = service.search(&index, &SearchQuery { tokens, limit: params.limit })?;
    Ok(HttpResponse::Ok().json(result))
}
