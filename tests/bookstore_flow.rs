mod common;

use bookstore_api::{
    dto::{
        books::BookPayload,
        cart::{AddToCartRequest, UpdateCartItemRequest},
        orders::CheckoutRequest,
        rentals::CreateRentalRequest,
    },
    entity::{
        orders::{ActiveModel as OrderActive, Entity as Orders},
        rentals::{ActiveModel as RentalActive, Entity as Rentals},
    },
    error::AppError,
    middleware::auth::{AdminUser, AuthUser},
    models::{OrderStatus, RentalPeriod, Role},
    routes::params::Pagination,
    services::{admin_service, book_service, cart_service, order_service, rental_service},
    state::AppState,
};
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, Set};
use tower::ServiceExt;
use uuid::Uuid;

use common::{create_book, create_user, pages_app, setup_state, token_for};

// A single test drives every flow so the shared tables are truncated once.
#[tokio::test]
async fn bookstore_flows() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let user = create_user(&state, Role::User, "user@example.com").await?;
    let other = create_user(&state, Role::User, "other@example.com").await?;
    let admin = AdminUser(create_user(&state, Role::Admin, "admin@example.com").await?);

    cart_and_checkout(&state, &user, &other).await?;
    rentals_and_reminders(&state, &user, &admin).await?;
    admin_catalog_and_stats(&state, &user, &admin).await?;
    order_history_pages(&state).await?;
    Ok(())
}

async fn cart_and_checkout(
    state: &AppState,
    user: &AuthUser,
    other: &AuthUser,
) -> anyhow::Result<()> {
    let book_a = create_book(state, "Cart Book A", 100, true).await?;
    let book_b = create_book(state, "Cart Book B", 250, true).await?;
    let hidden = create_book(state, "Hidden Book", 999, false).await?;

    let empty = cart_service::get_cart(state, user).await?.data.unwrap();
    assert_eq!(empty.id, None);
    assert_eq!(empty.total_amount, 0);

    let cart = cart_service::add_to_cart(
        state,
        user,
        AddToCartRequest {
            book_id: Some(book_a),
            quantity: Some(1),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cart.total_amount, 100);
    assert_eq!(cart.status, Some(OrderStatus::Pending));

    // Same book again merges into one line.
    let cart = cart_service::add_to_cart(
        state,
        user,
        AddToCartRequest {
            book_id: Some(book_a),
            quantity: Some(2),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cart.order_items.len(), 1);
    assert_eq!(cart.order_items[0].quantity, 3);
    assert_eq!(cart.total_amount, 300);

    let unavailable = cart_service::add_to_cart(
        state,
        user,
        AddToCartRequest {
            book_id: Some(hidden),
            quantity: Some(1),
        },
    )
    .await;
    assert!(matches!(unavailable, Err(AppError::NotFound)));

    let cart = cart_service::add_to_cart(
        state,
        user,
        AddToCartRequest {
            book_id: Some(book_b),
            quantity: Some(1),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cart.total_amount, 550);
    let order_id = cart.id.unwrap();
    let line_a = cart
        .order_items
        .iter()
        .find(|item| item.book_id == book_a)
        .map(|item| item.id)
        .unwrap();
    let line_b = cart
        .order_items
        .iter()
        .find(|item| item.book_id == book_b)
        .map(|item| item.id)
        .unwrap();

    let foreign = cart_service::update_item_quantity(
        state,
        other,
        line_a,
        UpdateCartItemRequest { quantity: Some(5) },
    )
    .await;
    assert!(matches!(foreign, Err(AppError::Forbidden)));

    let cart = cart_service::update_item_quantity(
        state,
        user,
        line_a,
        UpdateCartItemRequest { quantity: Some(1) },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cart.total_amount, 350);

    let cart = cart_service::remove_item(state, user, line_b).await?.data.unwrap();
    assert_eq!(cart.total_amount, 100);

    // Removing the last line deletes the pending order.
    let cart = cart_service::remove_item(state, user, line_a).await?.data.unwrap();
    assert_eq!(cart.id, None);
    assert!(Orders::find_by_id(order_id).one(&state.orm).await?.is_none());

    let cart = cart_service::add_to_cart(
        state,
        user,
        AddToCartRequest {
            book_id: Some(book_b),
            quantity: Some(2),
        },
    )
    .await?
    .data
    .unwrap();
    let order_id = cart.id.unwrap();

    let others_checkout = order_service::checkout(
        state,
        other,
        CheckoutRequest {
            order_id: Some(order_id),
        },
    )
    .await;
    assert!(matches!(others_checkout, Err(AppError::NotFound)));

    let order = order_service::checkout(
        state,
        user,
        CheckoutRequest {
            order_id: Some(order_id),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.total_amount, 500);

    let again = order_service::checkout(
        state,
        user,
        CheckoutRequest {
            order_id: Some(order_id),
        },
    )
    .await;
    assert!(matches!(again, Err(AppError::NotFound)));

    // Paid orders leave the cart and show up in history.
    let cart = cart_service::get_cart(state, user).await?.data.unwrap();
    assert_eq!(cart.id, None);
    let history = order_service::list_orders(state, user, Pagination::default())
        .await?
        .data
        .unwrap();
    assert_eq!(history.items.len(), 1);
    assert_eq!(history.items[0].order.id, order_id);
    assert_eq!(history.items[0].items.len(), 1);

    // A pending order with no lines cannot be checked out and stays pending.
    let empty_order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        total_amount: Set(0),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    let rejected = order_service::checkout(
        state,
        user,
        CheckoutRequest {
            order_id: Some(empty_order.id),
        },
    )
    .await;
    assert!(matches!(rejected, Err(AppError::Conflict(_))));
    let reread = Orders::find_by_id(empty_order.id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(reread.status, OrderStatus::Pending.as_str());
    assert_eq!(reread.total_amount, 0);
    reread.delete(&state.orm).await?;

    Ok(())
}

async fn rentals_and_reminders(
    state: &AppState,
    user: &AuthUser,
    admin: &AdminUser,
) -> anyhow::Result<()> {
    let book = create_book(state, "Rental Book", 500, true).await?;
    let now = Utc::now();

    let rental = rental_service::create_rental(
        state,
        user,
        CreateRentalRequest {
            book_id: Some(book),
            rental_period: Some("ONE_MONTH".into()),
        },
        now,
    )
    .await?
    .data
    .unwrap();
    assert_eq!(rental.rental_period, RentalPeriod::OneMonth);
    assert_eq!(rental.end_date - rental.start_date, Duration::days(30));
    assert!(!rental.is_returned);

    let duplicate = rental_service::create_rental(
        state,
        user,
        CreateRentalRequest {
            book_id: Some(book),
            rental_period: Some("TWO_WEEKS".into()),
        },
        now,
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    // Pull the end date into the reminder window.
    let mut active: RentalActive = Rentals::find_by_id(rental.id)
        .one(&state.orm)
        .await?
        .unwrap()
        .into();
    active.end_date = Set((now + Duration::days(2)).into());
    active.update(&state.orm).await?;

    let overdue_book = create_book(state, "Overdue Book", 300, true).await?;
    let overdue = rental_service::create_rental(
        state,
        user,
        CreateRentalRequest {
            book_id: Some(overdue_book),
            rental_period: Some("TWO_WEEKS".into()),
        },
        now - Duration::days(20),
    )
    .await?
    .data
    .unwrap();

    let summary = rental_service::send_reminders(state, admin, now)
        .await?
        .data
        .unwrap();
    assert!(summary.success);
    assert_eq!(summary.upcoming, 1);
    assert_eq!(summary.overdue, 1);
    assert_eq!(summary.total, 2);

    let rentals = admin_service::list_rentals(state, admin, now)
        .await?
        .data
        .unwrap();
    let flagged = rentals
        .items
        .iter()
        .find(|r| r.rental.id == overdue.id)
        .unwrap();
    assert!(flagged.is_overdue);
    assert!(flagged.rental.reminder_sent);

    let rerun = rental_service::send_reminders(state, admin, now)
        .await?
        .data
        .unwrap();
    assert_eq!(rerun.total, 0);

    let returned = rental_service::return_rental(state, user, rental.id)
        .await?
        .data
        .unwrap();
    assert!(returned.is_returned);
    let twice = rental_service::return_rental(state, user, rental.id).await;
    assert!(matches!(twice, Err(AppError::Conflict(_))));

    // Returning frees the book for another rental.
    rental_service::create_rental(
        state,
        user,
        CreateRentalRequest {
            book_id: Some(book),
            rental_period: Some("THREE_MONTHS".into()),
        },
        now,
    )
    .await?;

    let mine = rental_service::list_rentals(state, user).await?.data.unwrap();
    assert_eq!(mine.items.len(), 3);

    Ok(())
}

async fn admin_catalog_and_stats(
    state: &AppState,
    user: &AuthUser,
    admin: &AdminUser,
) -> anyhow::Result<()> {
    let created = book_service::create_book(
        state,
        admin,
        BookPayload {
            title: Some("Dune".into()),
            author: Some("Frank Herbert".into()),
            category: Some("Science Fiction".into()),
            year: Some(1965),
            description: Some("Desert planet".into()),
            price: Some(900),
            rental_price: Some(200),
            image_url: None,
            is_available: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert!(created.is_available);

    let patched = book_service::patch_book(
        state,
        admin,
        created.id,
        BookPayload {
            price: Some(950),
            is_available: Some(false),
            ..BookPayload::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(patched.price, 950);
    assert_eq!(patched.title, "Dune");

    // Unavailable books disappear from the catalog but not from the admin list.
    let catalog = book_service::list_books(state, Default::default())
        .await?
        .data
        .unwrap();
    assert!(catalog.items.iter().all(|b| b.id != created.id));
    let all = book_service::list_all_books(state, admin).await?.data.unwrap();
    assert!(all.items.iter().any(|b| b.id == created.id));

    book_service::delete_book(state, admin, created.id).await?;
    let gone = book_service::get_book(state, created.id).await;
    assert!(matches!(gone, Err(AppError::NotFound)));

    // Books referenced by orders or rentals cannot be deleted.
    let referenced = book_service::list_all_books(state, admin)
        .await?
        .data
        .unwrap()
        .items
        .into_iter()
        .find(|b| b.title == "Rental Book")
        .unwrap();
    let blocked = book_service::delete_book(state, admin, referenced.id).await;
    assert!(matches!(blocked, Err(AppError::Conflict(_))));

    let stats = admin_service::stats(state, admin, Utc::now())
        .await?
        .data
        .unwrap();
    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.total_books, 5);
    assert_eq!(stats.active_rentals, 2);
    assert_eq!(stats.orders_this_month, 1);

    let me = bookstore_api::services::auth_service::current_user(state, user)
        .await?
        .data
        .unwrap();
    assert_eq!(me.email, "user@example.com");

    Ok(())
}

// More paid orders than fit on one page; every one must be reachable from the history page.
async fn order_history_pages(state: &AppState) -> anyhow::Result<()> {
    let reader = create_user(state, Role::User, "reader@example.com").await?;
    let now = Utc::now();
    let mut order_ids = Vec::new();
    for i in 0..25 {
        let order = OrderActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(reader.user_id),
            status: Set(OrderStatus::Paid.as_str().to_string()),
            total_amount: Set(0),
            created_at: Set((now - Duration::minutes(i)).into()),
            updated_at: NotSet,
        }
        .insert(&state.orm)
        .await?;
        order_ids.push(order.id);
    }

    let token = token_for(reader.user_id, Role::User);
    let mut rendered = String::new();
    for uri in ["/profile/orders", "/profile/orders?page=2"] {
        let response = pages_app(state.orm.clone())
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(header::COOKIE, format!("session={token}"))
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let bytes = response.into_body().collect().await?.to_bytes();
        let html = String::from_utf8_lossy(&bytes).into_owned();
        if uri == "/profile/orders" {
            assert!(html.contains("page=2&amp;per_page=20"));
        }
        rendered.push_str(&html);
    }

    for id in order_ids {
        assert!(rendered.contains(&id.to_string()), "order {id} not listed");
    }
    Ok(())
}
