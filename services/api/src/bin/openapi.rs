//! services/api/src/bin/openapi.rs
//!
//! Writes the REST surface's OpenAPI 3.0 document to `openapi.json`, for
//! client generation and CI diffing.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = "openapi.json";
    std::fs::write(path, ApiDoc::openapi().to_pretty_json()?)?;
    println!("Wrote {}", path);
    Ok(())
}
