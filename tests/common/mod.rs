#![allow(dead_code)]

use axum::Router;
use bookstore_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    entity::{books::ActiveModel as BookActive, users::ActiveModel as UserActive},
    middleware::auth::AuthUser,
    models::Role,
    pages,
    routes::create_api_router,
    services::auth_service::issue_token,
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, Set, Statement};
use tower_cookies::CookieManagerLayer;
use uuid::Uuid;

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://localhost/bookstore_test".into(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "integration-secret".into(),
        session_ttl_hours: 1,
        max_connections: 2,
        cookie_secure: false,
    }
}

/// The `/api` router over an arbitrary connection, cookies enabled.
pub fn api_app(orm: DatabaseConnection) -> Router {
    let state = AppState::new(orm, test_config());
    Router::new()
        .nest("/api", create_api_router())
        .layer(CookieManagerLayer::new())
        .with_state(state)
}

/// The HTML pages over an arbitrary connection, cookies enabled.
pub fn pages_app(orm: DatabaseConnection) -> Router {
    let state = AppState::new(orm, test_config());
    pages::router()
        .layer(CookieManagerLayer::new())
        .with_state(state)
}

pub fn token_for(user_id: Uuid, role: Role) -> String {
    issue_token(&test_config(), user_id, role).expect("token")
}

/// Connect to the test database, or `None` when no database is configured.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url, 2).await?;
    run_migrations(&pool).await?;
    let orm = create_orm_conn(pool);

    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, rentals, books, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    let config = AppConfig {
        database_url,
        ..test_config()
    };
    Ok(Some(AppState::new(orm, config)))
}

pub async fn create_user(state: &AppState, role: Role, email: &str) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(email.split('@').next().unwrap_or(email).to_string()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.as_str().to_string()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}

pub async fn create_book(
    state: &AppState,
    title: &str,
    price: i64,
    is_available: bool,
) -> anyhow::Result<Uuid> {
    let book = BookActive {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_string()),
        author: Set("Test Author".into()),
        category: Set("Testing".into()),
        year: Set(2020),
        description: Set("A book for testing".into()),
        price: Set(price),
        rental_price: Set(price / 5),
        image_url: Set(None),
        is_available: Set(is_available),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(book.id)
}
