//! Server-rendered HTML pages. Forms post back to these routes, which call the
//! same services as the JSON API and redirect on success.

use axum::{
    Router,
    extract::{
        FromRef, FromRequest, FromRequestParts,
        rejection::{FormRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use maud::{DOCTYPE, Markup, html};

use crate::{
    error::AppError,
    middleware::auth::{AdminUser, AuthUser},
    state::AppState,
};

mod account;
mod admin;
mod catalog;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::home))
        .route("/books", get(catalog::catalog))
        .route("/books/{id}", get(catalog::book_detail))
        .route("/books/{id}/cart", post(account::add_to_cart))
        .route("/books/{id}/rent", post(account::rent_book))
        .route("/login", get(account::login_page).post(account::login))
        .route("/logout", post(account::logout))
        .route("/cart", get(account::cart))
        .route("/cart/items/{id}", post(account::update_item))
        .route("/cart/items/{id}/remove", post(account::remove_item))
        .route("/cart/checkout", post(account::checkout))
        .route("/profile", get(account::profile))
        .route("/profile/orders", get(account::orders))
        .route("/profile/rentals", get(account::rentals))
        .route("/profile/rentals/{id}/return", post(account::return_rental))
        .route("/admin", get(admin::dashboard))
        .route("/admin/rental-reminders", post(admin::send_reminders))
        .route("/admin/books", get(admin::books).post(admin::create_book))
        .route("/admin/books/new", get(admin::new_book))
        .route("/admin/books/{id}", post(admin::update_book))
        .route("/admin/books/{id}/edit", get(admin::edit_book))
        .route("/admin/books/{id}/delete", post(admin::delete_book))
        .route("/admin/rentals", get(admin::rentals))
}

/// [`AppError`] rendered as HTML. Anonymous visitors are sent to the login form.
#[derive(Debug)]
pub struct PageError(pub AppError);

pub type PageResult<T> = Result<T, PageError>;

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        PageError(err)
    }
}

impl From<FormRejection> for PageError {
    fn from(rejection: FormRejection) -> Self {
        PageError(rejection.into())
    }
}

impl From<PathRejection> for PageError {
    fn from(rejection: PathRejection) -> Self {
        PageError(rejection.into())
    }
}

impl From<QueryRejection> for PageError {
    fn from(rejection: QueryRejection) -> Self {
        PageError(rejection.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let PageError(err) = self;
        if matches!(err, AppError::Unauthorized) {
            return Redirect::to("/login").into_response();
        }

        err.log();
        let status = err.status();
        let page = layout(
            status.canonical_reason().unwrap_or("Error"),
            html! {
                h1 { (status.as_u16()) }
                p.error { (err) }
                p { a href="/" { "Back to the bookstore" } }
            },
        );
        (status, page).into_response()
    }
}

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Form), rejection(PageError))]
pub struct PageForm<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(PageError))]
pub struct PagePath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(PageError))]
pub struct PageQuery<T>(pub T);

/// Signed-in visitor.
#[derive(Debug, Clone)]
pub struct PageUser(pub AuthUser);

/// Signed-in administrator; other signed-in users are sent back to the home page.
#[derive(Debug, Clone)]
pub struct PageAdmin(pub AdminUser);

impl<S> FromRequestParts<S> for PageUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        Ok(PageUser(user))
    }
}

impl<S> FromRequestParts<S> for PageAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match AdminUser::from_request_parts(parts, state).await {
            Ok(admin) => Ok(PageAdmin(admin)),
            Err(AppError::Forbidden) => Err(Redirect::to("/").into_response()),
            Err(err) => Err(PageError(err).into_response()),
        }
    }
}

pub(crate) fn layout(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | Bookstore" }
            }
            body {
                header {
                    nav {
                        a href="/" { "Bookstore" }
                        " · "
                        a href="/books" { "Catalog" }
                        " · "
                        a href="/cart" { "Cart" }
                        " · "
                        a href="/profile" { "Profile" }
                        " · "
                        a href="/admin" { "Admin" }
                        " · "
                        a href="/docs" { "API" }
                        " · "
                        a href="/login" { "Log in" }
                        form method="post" action="/logout" style="display:inline" {
                            " "
                            button type="submit" { "Log out" }
                        }
                    }
                }
                main { (content) }
            }
        }
    }
}

/// Plain `<form method="post">` holding a single button.
pub(crate) fn post_button(action: &str, label: &str) -> Markup {
    html! {
        form method="post" action=(action) style="display:inline" {
            button type="submit" { (label) }
        }
    }
}

pub(crate) fn status_page(status: StatusCode, title: &str, content: Markup) -> Response {
    (status, layout(title, content)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_visitor_is_sent_to_login() {
        let response = PageError(AppError::Unauthorized).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");
    }

    #[test]
    fn other_errors_keep_their_status() {
        let response = PageError(AppError::Forbidden).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = PageError(AppError::Conflict("Order has no items".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
