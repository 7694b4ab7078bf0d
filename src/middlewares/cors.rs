use actix_cors::Cors;

/// Browser callers come from the storefront origins the identity provider
/// mints sessions for. An empty list allows any origin (local development).
pub fn create_cors(allowed_origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["POST", "OPTIONS"])
        .allow_any_header()
        // session cookie travels with cross-origin requests
        .supports_credentials()
        .max_age(3600);

    if allowed_origins.is_empty() {
        return cors.allowed_origin_fn(|_, _req_head| true);
    }

    allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}
