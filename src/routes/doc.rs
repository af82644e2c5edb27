use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{AdminRental, AdminRentalList, ReminderSummary, Stats},
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        books::{BookFilters, BookList, BookPayload, BookQuery, NewArrivalsQuery},
        cart::{AddToCartRequest, CartView, OrderItemWithBook, UpdateCartItemRequest},
        orders::{CheckoutRequest, OrderList, OrderWithItems},
        rentals::{CreateRentalRequest, RentalList, RentalWithBook},
    },
    middleware::auth::SESSION_COOKIE,
    models::{Book, BookSummary, Order, OrderStatus, Rental, RentalPeriod, Role, User, UserSummary},
    response::{ApiResponse, Meta},
    routes::{admin, auth, books, cart, health, orders, params, rentals},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        books::list_books,
        books::book_filters,
        books::new_arrivals,
        books::get_book,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_item,
        cart::remove_item,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        rentals::list_rentals,
        rentals::create_rental,
        rentals::return_rental,
        admin::stats,
        admin::send_rental_reminders,
        admin::list_rentals,
        admin::list_books,
        admin::create_book,
        admin::get_book,
        admin::replace_book,
        admin::patch_book,
        admin::delete_book
    ),
    components(
        schemas(
            User,
            UserSummary,
            Role,
            Book,
            BookSummary,
            Order,
            OrderStatus,
            Rental,
            RentalPeriod,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            BookQuery,
            NewArrivalsQuery,
            BookList,
            BookFilters,
            BookPayload,
            AddToCartRequest,
            UpdateCartItemRequest,
            OrderItemWithBook,
            CartView,
            CheckoutRequest,
            OrderWithItems,
            OrderList,
            CreateRentalRequest,
            RentalWithBook,
            RentalList,
            Stats,
            ReminderSummary,
            AdminRental,
            AdminRentalList,
            params::Pagination,
            health::HealthData,
            Meta,
            ApiResponse<Book>,
            ApiResponse<BookList>,
            ApiResponse<CartView>,
            ApiResponse<OrderList>,
            ApiResponse<RentalList>,
            ApiResponse<Stats>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Registration and session endpoints"),
        (name = "Books", description = "Public catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout and order history"),
        (name = "Rentals", description = "Rental endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
