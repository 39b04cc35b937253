use std::net::SocketAddr;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::{
    auth::{
        self,
        middleware::{require_admin, require_auth},
        session::session_guard,
    },
    state::AppState,
    users,
};

const BODY_LIMIT: usize = 5 * 1024 * 1024;

pub fn build_app(state: AppState) -> Router {
    let admin = users::handlers::admin_routes()
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    // Layers run bottom-up: auth loads the user, then the session checks run.
    let authenticated = users::handlers::session_routes()
        .merge(admin)
        .route_layer(from_fn_with_state(state.clone(), session_guard))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let activity = Router::new()
        .route("/activity", post(auth::handlers::activity))
        .route_layer(from_fn_with_state(state.clone(), session_guard))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let users_api = auth::handlers::public_routes().merge(authenticated);

    Router::new()
        .nest(
            "/api",
            Router::new()
                .nest("/users", users_api)
                .merge(activity)
                .route("/health", get(|| async { "ok" })),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors_layer(&state.config.cors_origins))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(origin = %o, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "4000".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::FromRef,
        http::{
            header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
            Request, StatusCode,
        },
        response::Response,
    };
    use time::Duration as TimeDuration;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth::jwt::JwtKeys;

    async fn call(req: Request<Body>) -> Response {
        build_app(AppState::fake())
            .oneshot(req)
            .await
            .expect("infallible")
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let resp = call(Request::get("/api/health").body(Body::empty()).unwrap()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_route_without_cookie_is_401() {
        let resp = call(Request::get("/api/users/me").body(Body::empty()).unwrap()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["msg"], "token not provided");
    }

    #[tokio::test]
    async fn admin_route_without_cookie_is_401_not_403() {
        let resp = call(Request::get("/api/users").body(Body::empty()).unwrap()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = call(
            Request::delete(format!("/api/users/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let resp = call(
            Request::get("/api/users/profile")
                .header(COOKIE, "token=not.a.jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["msg"], "invalid or expired token");
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state)
            .sign_for(Uuid::new_v4(), TimeDuration::hours(-1))
            .expect("sign");
        let resp = build_app(state)
            .oneshot(
                Request::post("/api/activity")
                    .header(COOKIE, format!("token={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("infallible");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_clears_cookie() {
        let resp = call(Request::post("/api/users/logout").body(Body::empty()).unwrap()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("set-cookie")
            .to_string();
        assert!(cookie.starts_with("token=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert_eq!(json_body(resp).await["msg"], "logged out successfully");
    }

    #[tokio::test]
    async fn login_validates_before_touching_the_database() {
        let resp = call(post_json("/api/users/login", r#"{"email":"nope","password":"x"}"#)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["msg"], "invalid email");

        let resp = call(post_json("/api/users/login", r#"{"email":"ana@example.com"}"#)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["msg"], "password is required");
    }

    #[tokio::test]
    async fn malformed_bodies_answer_with_json_400() {
        let resp = call(
            Request::post("/api/users/login")
                .body(Body::from(r#"{"email":"ana@example.com","password":"x"}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(resp).await["msg"].is_string());

        let resp = call(post_json("/api/users/login", r#"{"email":5}"#)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(resp).await["msg"].is_string());

        let resp = call(post_json("/api/users/forgot-password", "{not json")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(resp).await["msg"].is_string());
    }

    #[tokio::test]
    async fn reset_password_rejects_weak_password() {
        let resp = call(post_json(
            "/api/users/reset-password/deadbeef",
            r#"{"password":"123"}"#,
        ))
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn forgot_password_requires_email() {
        let resp = call(post_json("/api/users/forgot-password", "{}")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["msg"], "email is required");
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_origin_with_credentials() {
        let resp = call(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/users/login")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        let headers = resp.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).map(|v| v.as_bytes()),
            Some(&b"http://localhost:5173"[..])
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).map(|v| v.as_bytes()),
            Some(&b"true"[..])
        );
    }
}
