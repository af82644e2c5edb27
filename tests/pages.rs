mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use bookstore_api::models::Role;
use http_body_util::BodyExt;
use sea_orm::DatabaseConnection;
use tower::ServiceExt;
use uuid::Uuid;

use common::{pages_app, token_for};

// None of these requests reach the database.
async fn send(request: Request<Body>) -> (StatusCode, Option<String>, String) {
    let response = pages_app(DatabaseConnection::Disconnected)
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, location, String::from_utf8_lossy(&bytes).into_owned())
}

fn page(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("session={token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn form(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("session={token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn login_page_renders_a_form() {
    let (status, _, html) = send(page("/login", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("action=\"/login\""));
    assert!(html.contains("name=\"password\""));
}

#[tokio::test]
async fn account_pages_redirect_anonymous_visitors() {
    for uri in ["/cart", "/profile", "/profile/orders", "/profile/rentals", "/admin", "/admin/books"] {
        let (status, location, _) = send(page(uri, None)).await;
        assert_eq!(status, StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location.as_deref(), Some("/login"), "{uri}");
    }

    let uri = format!("/books/{}/cart", Uuid::new_v4());
    let (status, location, _) = send(form(&uri, None, "quantity=1")).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn admin_pages_send_regular_users_home() {
    let token = token_for(Uuid::new_v4(), Role::User);
    for uri in ["/admin", "/admin/books", "/admin/books/new", "/admin/rentals"] {
        let (status, location, _) = send(page(uri, Some(&token))).await;
        assert_eq!(status, StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location.as_deref(), Some("/"), "{uri}");
    }

    let (status, location, _) = send(form("/admin/rental-reminders", Some(&token), "")).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/"));
}

#[tokio::test]
async fn signed_in_visitors_skip_the_login_form() {
    let token = token_for(Uuid::new_v4(), Role::User);
    let (status, location, _) = send(page("/login", Some(&token))).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/"));

    let (status, _, html) = send(page("/login", Some("expired.or.forged"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("action=\"/login\""));
}

#[tokio::test]
async fn out_of_range_history_page_is_a_bad_request() {
    let token = token_for(Uuid::new_v4(), Role::User);
    let uri = format!("/profile/orders?page={}", i64::MAX);
    let (status, _, html) = send(page(&uri, Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(html.contains("page is out of range"));
}

#[tokio::test]
async fn admin_sees_the_new_book_form() {
    let token = token_for(Uuid::new_v4(), Role::Admin);
    let (status, _, html) = send(page("/admin/books/new", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("action=\"/admin/books\""));
    assert!(html.contains("name=\"rental_price\""));
}

#[tokio::test]
async fn invalid_book_form_is_a_bad_request() {
    let token = token_for(Uuid::new_v4(), Role::Admin);
    let body = "title=Dune&author=Frank+Herbert&category=SF&year=soon&description=x&price=1&rental_price=1";
    let (status, _, html) = send(form("/admin/books", Some(&token), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(html.contains("year"));

    let (status, _, html) = send(form("/admin/books", Some(&token), "title=Dune")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(html.contains("author"));
}

#[tokio::test]
async fn malformed_ids_render_an_error_page() {
    let (status, _, html) = send(page("/books/not-a-uuid", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(html.contains("<html"));

    let token = token_for(Uuid::new_v4(), Role::User);
    let (status, _, _) = send(form("/cart/items/42", Some(&token), "quantity=1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_numeric_quantity_is_rejected() {
    let token = token_for(Uuid::new_v4(), Role::User);
    let uri = format!("/books/{}/cart", Uuid::new_v4());
    let (status, _, _) = send(form(&uri, Some(&token), "quantity=lots")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_redirects_home_and_clears_the_cookie() {
    let response = pages_app(DatabaseConnection::Disconnected)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/logout")
                .header(header::COOKIE, "session=stale")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.contains("Max-Age=0"), "unexpected cookie: {cookie}");
}
