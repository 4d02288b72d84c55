//! Prints the OpenAPI document of the HTTP API.

use matchday_back::services::documentation::ApiDoc;
use utoipa::OpenApi;

/// Print the OpenAPI document to stdout.
fn main() -> Result<(), serde_json::Error> {
    println!("{}", ApiDoc::openapi().to_pretty_json()?);
    Ok(())
}
