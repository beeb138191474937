use std::net::SocketAddr;

use axum::{
    extract::Request,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{auth, state::AppState, todos};

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .nest(
            "/api",
            Router::new().merge(auth::router()).merge(todos::router()),
        )
        .route("/health", get(health))
        .with_state(state)
        .layer(middleware::from_fn(answer_preflight))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &Response, _latency: std::time::Duration, span: &tracing::Span| {
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
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// OPTIONS never reaches routing or the session gate.
async fn answer_preflight(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(req).await
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

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
        http::{header, Request},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn app() -> Router {
        build_app(AppState::fake().await)
    }

    fn json_request(
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Value,
    ) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn empty_request(method: Method, uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(res: Response) -> Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Register and log in, returning the `name=value` pair for the Cookie header.
    async fn login_cookie(app: &Router, email: &str) -> String {
        let creds = json!({ "email": email, "password": "secret123" });
        let res = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/auth/register", None, creds.clone()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/auth/login", None, creds))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let set_cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie")
            .to_str()
            .unwrap();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let res = app()
            .await
            .oneshot(empty_request(Method::GET, "/health", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await, json!({ "status": "healthy" }));
    }

    #[tokio::test]
    async fn protected_routes_require_a_session() {
        let app = app().await;
        let res = app
            .clone()
            .oneshot(empty_request(Method::GET, "/api/todos", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(res).await, json!({ "error": "Authentication required" }));

        let res = app
            .oneshot(empty_request(
                Method::GET,
                "/api/todos",
                Some("auth-session=forged.token.value"),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn options_bypasses_the_gate() {
        let res = app()
            .await
            .oneshot(empty_request(Method::OPTIONS, "/api/todos/1/toggle", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn cors_allows_listed_origin_with_credentials_only() {
        let app = app().await;
        let preflight = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/todos")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();
        let res = app.clone().oneshot(preflight).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let headers = res.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
        let methods = headers
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap();
        for method in ["GET", "POST", "PUT", "DELETE", "PATCH"] {
            assert!(methods.contains(method), "missing {method} in {methods}");
        }
        let allowed_headers = headers
            .get(header::ACCESS_CONTROL_ALLOW_HEADERS)
            .unwrap()
            .to_str()
            .unwrap()
            .to_ascii_lowercase();
        assert!(allowed_headers.contains("content-type"));
        assert!(allowed_headers.contains("authorization"));

        let foreign = Request::builder()
            .method(Method::GET)
            .uri("/health")
            .header(header::ORIGIN, "http://evil.example")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(foreign).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn register_rejects_bad_input_and_duplicates() {
        let app = app().await;
        let res = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                json!({ "email": "nope", "password": "secret123" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(res).await["error"].is_string());

        login_cookie(&app, "dup@example.com").await;
        let res = app
            .oneshot(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                json!({ "email": "dup@example.com", "password": "secret123" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn register_response_hides_password_hash() {
        let res = app()
            .await
            .oneshot(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                json!({ "email": "ann@example.com", "password": "secret123" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body = body_json(res).await;
        assert_eq!(body["message"], "User created successfully");
        assert_eq!(body["user"]["email"], "ann@example.com");
        assert!(body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app().await.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let app = app().await;
        login_cookie(&app, "ann@example.com").await;
        let res = app
            .oneshot(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                json!({ "email": "ann@example.com", "password": "wrong-one" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(res).await, json!({ "error": "Invalid credentials" }));
    }

    #[tokio::test]
    async fn todo_lifecycle() {
        let app = app().await;
        let cookie = login_cookie(&app, "ann@example.com").await;

        let res = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/todos",
                Some(&cookie),
                json!({ "title": "Buy milk" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let created = body_json(res).await;
        assert_eq!(created["priority"], 1);
        assert_eq!(created["completed"], false);
        let id = created["id"].as_i64().unwrap();

        let res = app
            .clone()
            .oneshot(empty_request(
                Method::PATCH,
                &format!("/api/todos/{id}/toggle"),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let toggled = body_json(res).await;
        assert_eq!(toggled["completed"], true);
        assert_ne!(toggled["updated_at"], created["updated_at"]);

        let res = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/todos/{id}"),
                Some(&cookie),
                json!({ "title": "Buy oat milk", "description": "2 litres", "priority": 2 }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["title"], "Buy oat milk");

        let res = app
            .clone()
            .oneshot(empty_request(Method::GET, "/api/todos", Some(&cookie)))
            .await
            .unwrap();
        let list = body_json(res).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let res = app
            .clone()
            .oneshot(empty_request(
                Method::DELETE,
                &format!("/api/todos/{id}"),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            body_json(res).await,
            json!({ "message": "Todo deleted successfully" })
        );

        let res = app
            .oneshot(empty_request(Method::GET, "/api/todos", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(body_json(res).await, json!([]));
    }

    #[tokio::test]
    async fn other_users_cannot_touch_foreign_todos() {
        let app = app().await;
        let owner = login_cookie(&app, "owner@example.com").await;
        let intruder = login_cookie(&app, "intruder@example.com").await;

        let res = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/todos",
                Some(&owner),
                json!({ "title": "private" }),
            ))
            .await
            .unwrap();
        let id = body_json(res).await["id"].as_i64().unwrap();

        let res = app
            .clone()
            .oneshot(empty_request(
                Method::DELETE,
                &format!("/api/todos/{id}"),
                Some(&intruder),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/todos/{id}"),
                Some(&intruder),
                json!({ "title": "mine now", "description": "", "priority": 1 }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = app
            .clone()
            .oneshot(empty_request(
                Method::PATCH,
                &format!("/api/todos/{id}/toggle"),
                Some(&intruder),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = app
            .clone()
            .oneshot(empty_request(Method::GET, "/api/todos", Some(&intruder)))
            .await
            .unwrap();
        assert_eq!(body_json(res).await, json!([]));

        let res = app
            .oneshot(empty_request(Method::GET, "/api/todos", Some(&owner)))
            .await
            .unwrap();
        let list = body_json(res).await;
        assert_eq!(list[0]["title"], "private");
        assert_eq!(list[0]["completed"], false);
    }

    #[tokio::test]
    async fn non_numeric_id_is_a_bad_request() {
        let app = app().await;
        let cookie = login_cookie(&app, "ann@example.com").await;
        let res = app
            .oneshot(empty_request(Method::DELETE, "/api/todos/abc", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await, json!({ "error": "Invalid todo ID" }));
    }

    #[tokio::test]
    async fn logout_expires_the_cookie_even_without_a_session() {
        let res = app()
            .await
            .oneshot(empty_request(Method::POST, "/api/auth/logout", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let set_cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with("auth-session=;"));
        assert!(set_cookie.contains("Max-Age=0"));
        assert_eq!(body_json(res).await, json!({ "message": "Logout successful" }));
    }
}
