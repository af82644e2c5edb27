use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use maud::{Markup, html};
use serde::Deserialize;
use tower_cookies::Cookies;
use uuid::Uuid;

use super::{
    PageError, PageForm, PagePath, PageQuery, PageResult, PageUser, layout, post_button, status_page,
};
use crate::{
    dto::{
        auth::LoginRequest,
        cart::{AddToCartRequest, CartView, OrderItemWithBook, UpdateCartItemRequest},
        orders::{CheckoutRequest, OrderWithItems},
        rentals::{CreateRentalRequest, RentalWithBook},
    },
    error::AppError,
    middleware::auth::{expired_session_cookie, session_cookie},
    response::Meta,
    routes::params::Pagination,
    services::{auth_service, cart_service, order_service, rental_service},
    state::AppState,
};

const PROFILE_PREVIEW: usize = 3;

#[derive(Debug, Deserialize)]
pub struct QuantityForm {
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct RentForm {
    pub rental_period: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub order_id: Uuid,
}

fn date(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d").to_string()
}

fn login_form(error: Option<&str>) -> Markup {
    layout(
        "Log in",
        html! {
            h1 { "Log in" }
            @if let Some(error) = error {
                p.error { (error) }
            }
            form method="post" action="/login" {
                label { "Email " input type="email" name="email" required; }
                " "
                label { "Password " input type="password" name="password" required; }
                " "
                button type="submit" { "Log in" }
            }
        },
    )
}

/// Visitors who already hold a valid session go straight to the home page.
pub async fn login_page(session: Result<PageUser, PageError>) -> Response {
    match session {
        Ok(_) => Redirect::to("/").into_response(),
        Err(_) => login_form(None).into_response(),
    }
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    PageForm(payload): PageForm<LoginRequest>,
) -> PageResult<Response> {
    match auth_service::login_user(&state, payload).await {
        Ok(resp) => {
            if let Some(data) = resp.data {
                cookies.add(session_cookie(&state.config, data.token));
            }
            Ok(Redirect::to("/").into_response())
        }
        Err(AppError::BadRequest(message)) => Ok((
            StatusCode::BAD_REQUEST,
            login_form(Some(&message)),
        )
            .into_response()),
        Err(err) => Err(err.into()),
    }
}

pub async fn logout(cookies: Cookies) -> Redirect {
    cookies.remove(expired_session_cookie());
    Redirect::to("/")
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    PagePath(book_id): PagePath<Uuid>,
    PageForm(form): PageForm<QuantityForm>,
) -> PageResult<Redirect> {
    let payload = AddToCartRequest {
        book_id: Some(book_id),
        quantity: Some(form.quantity),
    };
    cart_service::add_to_cart(&state, &user, payload).await?;
    Ok(Redirect::to("/cart"))
}

pub async fn rent_book(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    PagePath(book_id): PagePath<Uuid>,
    PageForm(form): PageForm<RentForm>,
) -> PageResult<Redirect> {
    let payload = CreateRentalRequest {
        book_id: Some(book_id),
        rental_period: Some(form.rental_period),
    };
    rental_service::create_rental(&state, &user, payload, Utc::now()).await?;
    Ok(Redirect::to("/profile/rentals"))
}

fn cart_line(item: &OrderItemWithBook) -> Markup {
    html! {
        tr {
            td { a href={ "/books/" (item.book_id) } { (item.book.title) } }
            td { (item.book.author) }
            td { (item.price) }
            td {
                form method="post" action={ "/cart/items/" (item.id) } style="display:inline" {
                    input type="number" name="quantity" value=(item.quantity) min="1" required;
                    " "
                    button type="submit" { "Update" }
                }
            }
            td { (post_button(&format!("/cart/items/{}/remove", item.id), "Remove")) }
        }
    }
}

fn cart_view(cart: &CartView) -> Markup {
    html! {
        h1 { "Cart" }
        @if cart.order_items.is_empty() {
            p { "Your cart is empty. " a href="/books" { "Browse the catalog" } }
        } @else {
            table {
                thead {
                    tr { th { "Book" } th { "Author" } th { "Price" } th { "Quantity" } th {} }
                }
                tbody {
                    @for item in &cart.order_items {
                        (cart_line(item))
                    }
                }
            }
            p.total { "Total: " (cart.total_amount) }
            @if let Some(order_id) = cart.id {
                form method="post" action="/cart/checkout" {
                    input type="hidden" name="order_id" value=(order_id);
                    button type="submit" { "Checkout" }
                }
            }
        }
    }
}

pub async fn cart(State(state): State<AppState>, PageUser(user): PageUser) -> PageResult<Markup> {
    let cart = cart_service::get_cart(&state, &user)
        .await?
        .data
        .unwrap_or_else(CartView::empty);
    Ok(layout("Cart", cart_view(&cart)))
}

pub async fn update_item(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    PagePath(item_id): PagePath<Uuid>,
    PageForm(form): PageForm<QuantityForm>,
) -> PageResult<Redirect> {
    let payload = UpdateCartItemRequest {
        quantity: Some(form.quantity),
    };
    cart_service::update_item_quantity(&state, &user, item_id, payload).await?;
    Ok(Redirect::to("/cart"))
}

pub async fn remove_item(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    PagePath(item_id): PagePath<Uuid>,
) -> PageResult<Redirect> {
    cart_service::remove_item(&state, &user, item_id).await?;
    Ok(Redirect::to("/cart"))
}

pub async fn checkout(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    PageForm(form): PageForm<CheckoutForm>,
) -> PageResult<Response> {
    let payload = CheckoutRequest {
        order_id: Some(form.order_id),
    };
    match order_service::checkout(&state, &user, payload).await {
        Ok(_) => Ok(Redirect::to("/profile/orders").into_response()),
        Err(AppError::Conflict(message)) => Ok(status_page(
            StatusCode::BAD_REQUEST,
            "Checkout",
            html! {
                h1 { "Checkout failed" }
                p.error { (message) }
                p { a href="/cart" { "Back to the cart" } }
            },
        )),
        Err(err) => Err(PageError(err)),
    }
}

fn order_block(entry: &OrderWithItems) -> Markup {
    html! {
        article.order {
            h3 { "Order " (entry.order.id) }
            p { (date(entry.order.created_at)) " · " (entry.order.status.as_str()) " · Total " (entry.order.total_amount) }
            ul {
                @for item in &entry.items {
                    li { (item.book.title) " × " (item.quantity) " @ " (item.price) }
                }
            }
        }
    }
}

fn rental_row(entry: &RentalWithBook, now: DateTime<Utc>) -> Markup {
    let rental = &entry.rental;
    let overdue = !rental.is_returned && rental.end_date < now;
    html! {
        tr {
            td { a href={ "/books/" (rental.book_id) } { (entry.book.title) } }
            td { (rental.rental_period.as_str()) }
            td { (date(rental.start_date)) }
            td { (date(rental.end_date)) }
            td {
                @if rental.is_returned {
                    "Returned"
                } @else if overdue {
                    "Overdue"
                } @else {
                    "Active"
                }
            }
            td {
                @if !rental.is_returned {
                    (post_button(&format!("/profile/rentals/{}/return", rental.id), "Return"))
                }
            }
        }
    }
}

fn rental_table(rentals: &[&RentalWithBook], now: DateTime<Utc>) -> Markup {
    html! {
        table {
            thead {
                tr { th { "Book" } th { "Period" } th { "Start" } th { "End" } th { "Status" } th {} }
            }
            tbody {
                @for entry in rentals {
                    (rental_row(entry, now))
                }
            }
        }
    }
}

pub async fn profile(
    State(state): State<AppState>,
    PageUser(user): PageUser,
) -> PageResult<Markup> {
    let me = auth_service::current_user(&state, &user)
        .await?
        .data
        .ok_or(AppError::NotFound)?;
    let rentals = rental_service::list_rentals(&state, &user)
        .await?
        .data
        .map(|list| list.items)
        .unwrap_or_default();
    let orders = order_service::list_orders(&state, &user, Pagination::default())
        .await?
        .data
        .map(|list| list.items)
        .unwrap_or_default();

    let active: Vec<&RentalWithBook> = rentals
        .iter()
        .filter(|entry| !entry.rental.is_returned)
        .take(PROFILE_PREVIEW)
        .collect();
    let now = Utc::now();

    Ok(layout(
        "Profile",
        html! {
            h1 { "My profile" }
            section {
                p { "Name: " (me.name) }
                p { "Email: " (me.email) }
            }
            section {
                h2 { "Active rentals" }
                @if active.is_empty() {
                    p { "No active rentals." }
                } @else {
                    (rental_table(&active, now))
                }
                p { a href="/profile/rentals" { "All rentals" } }
            }
            section {
                h2 { "Recent orders" }
                @if orders.is_empty() {
                    p { "No orders yet." }
                }
                @for entry in orders.iter().take(PROFILE_PREVIEW) {
                    (order_block(entry))
                }
                p { a href="/profile/orders" { "All orders" } }
            }
        },
    ))
}

pub async fn orders(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    PageQuery(pagination): PageQuery<Pagination>,
) -> PageResult<Markup> {
    let resp = order_service::list_orders(&state, &user, pagination).await?;
    let meta = resp.meta.unwrap_or_else(Meta::empty);
    let orders = resp.data.map(|list| list.items).unwrap_or_default();

    Ok(layout(
        "Orders",
        html! {
            h1 { "My orders" }
            @if orders.is_empty() {
                p { "No orders yet." }
            }
            @for entry in &orders {
                (order_block(entry))
            }
            (pager("/profile/orders", &meta))
        },
    ))
}

/// Previous/next links for a paginated listing; empty when everything fits on one page.
fn pager(base: &str, meta: &Meta) -> Markup {
    let (Some(page), Some(per_page), Some(total)) = (meta.page, meta.per_page, meta.total) else {
        return html! {};
    };
    let has_next = page.saturating_mul(per_page) < total;
    html! {
        @if page > 1 || has_next {
            nav.pager {
                @if page > 1 {
                    a rel="prev" href={ (base) "?page=" (page - 1) "&per_page=" (per_page) } { "Newer" }
                    " "
                }
                "Page " (page)
                @if has_next {
                    " "
                    a rel="next" href={ (base) "?page=" (page + 1) "&per_page=" (per_page) } { "Older" }
                }
            }
        }
    }
}

pub async fn rentals(State(state): State<AppState>, PageUser(user): PageUser) -> PageResult<Markup> {
    let rentals = rental_service::list_rentals(&state, &user)
        .await?
        .data
        .map(|list| list.items)
        .unwrap_or_default();
    let all: Vec<&RentalWithBook> = rentals.iter().collect();

    Ok(layout(
        "Rentals",
        html! {
            h1 { "My rentals" }
            @if all.is_empty() {
                p { "No rentals yet." }
            } @else {
                (rental_table(&all, Utc::now()))
            }
        },
    ))
}

pub async fn return_rental(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    PagePath(rental_id): PagePath<Uuid>,
) -> PageResult<Redirect> {
    rental_service::return_rental(&state, &user, rental_id).await?;
    Ok(Redirect::to("/profile/rentals"))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::{BookSummary, Rental, RentalPeriod};

    fn summary() -> BookSummary {
        BookSummary {
            id: Uuid::new_v4(),
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            image_url: None,
        }
    }

    fn rental_entry(end_date: DateTime<Utc>, is_returned: bool) -> RentalWithBook {
        let book = summary();
        RentalWithBook {
            rental: Rental {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                book_id: book.id,
                start_date: end_date - Duration::days(14),
                end_date,
                rental_period: RentalPeriod::TwoWeeks,
                is_returned,
                reminder_sent: false,
                created_at: end_date - Duration::days(14),
            },
            book,
        }
    }

    #[test]
    fn empty_cart_has_no_checkout() {
        let html = cart_view(&CartView::empty()).into_string();
        assert!(html.contains("Your cart is empty"));
        assert!(!html.contains("/cart/checkout"));
    }

    #[test]
    fn cart_lines_post_to_item_routes() {
        let book = summary();
        let item = OrderItemWithBook {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            book_id: book.id,
            quantity: 2,
            price: 900,
            book,
        };
        let cart = CartView {
            id: Some(item.order_id),
            status: None,
            total_amount: 1800,
            order_items: vec![item.clone()],
        };
        let html = cart_view(&cart).into_string();
        assert!(html.contains(&format!("action=\"/cart/items/{}\"", item.id)));
        assert!(html.contains(&format!("action=\"/cart/items/{}/remove\"", item.id)));
        assert!(html.contains(&format!("value=\"{}\"", item.order_id)));
        assert!(html.contains("Total: 1800"));
    }

    #[test]
    fn rental_rows_show_status() {
        let now = Utc::now();
        let overdue = rental_entry(now - Duration::days(1), false);
        let html = rental_row(&overdue, now).into_string();
        assert!(html.contains("Overdue"));
        assert!(html.contains(&format!("/profile/rentals/{}/return", overdue.rental.id)));

        let returned = rental_entry(now - Duration::days(1), true);
        let html = rental_row(&returned, now).into_string();
        assert!(html.contains("Returned"));
        assert!(!html.contains("/return"));
    }

    #[test]
    fn pager_links_neighbouring_pages() {
        let html = pager("/profile/orders", &Meta::new(1, 20, 45)).into_string();
        assert!(html.contains("href=\"/profile/orders?page=2&amp;per_page=20\""));
        assert!(!html.contains("rel=\"prev\""));

        let html = pager("/profile/orders", &Meta::new(3, 20, 45)).into_string();
        assert!(html.contains("href=\"/profile/orders?page=2&amp;per_page=20\""));
        assert!(!html.contains("rel=\"next\""));

        assert!(pager("/profile/orders", &Meta::new(1, 20, 20)).into_string().is_empty());
        assert!(pager("/profile/orders", &Meta::empty()).into_string().is_empty());
    }
}
