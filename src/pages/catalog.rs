use axum::extract::{Query, State};
use maud::{Markup, html};
use serde::Deserialize;
use uuid::Uuid;

use super::{PagePath, PageResult, layout};
use crate::{
    dto::books::{BookFilters, BookQuery},
    error::AppError,
    models::{Book, RentalPeriod},
    services::book_service::{self, DEFAULT_NEW_ARRIVALS},
    state::AppState,
};

/// Form fields arrive as strings; an empty `year` means "any year".
#[derive(Debug, Default, Deserialize)]
pub struct CatalogForm {
    pub category: Option<String>,
    pub author: Option<String>,
    pub year: Option<String>,
}

impl From<CatalogForm> for BookQuery {
    fn from(form: CatalogForm) -> Self {
        BookQuery {
            category: form.category,
            author: form.author,
            year: form.year.and_then(|y| y.trim().parse().ok()),
        }
    }
}

fn category_href(category: &str) -> String {
    format!("/books?category={}", urlencoding::encode(category))
}

pub(super) fn book_card(book: &Book) -> Markup {
    html! {
        article.book {
            @if let Some(url) = &book.image_url {
                img src=(url) alt=(book.title) width="120";
            }
            h3 { a href={ "/books/" (book.id) } { (book.title) } }
            p { (book.author) " · " (book.year) }
            p { "Buy " (book.price) " · Rent " (book.rental_price) }
        }
    }
}

pub async fn home(State(state): State<AppState>) -> PageResult<Markup> {
    let filters = book_service::book_filters(&state).await?.data.unwrap_or_default();
    let arrivals = book_service::new_arrivals(&state, DEFAULT_NEW_ARRIVALS)
        .await?
        .data
        .map(|list| list.items)
        .unwrap_or_default();

    Ok(layout(
        "Home",
        html! {
            h1 { "Welcome to the bookstore" }
            section {
                h2 { "Categories" }
                ul {
                    @for category in &filters.categories {
                        li { a href=(category_href(category)) { (category) } }
                    }
                }
            }
            section {
                h2 { "New arrivals" }
                @if arrivals.is_empty() {
                    p { "No books yet." }
                }
                @for book in &arrivals {
                    (book_card(book))
                }
            }
        },
    ))
}

fn filter_form(filters: &BookFilters, query: &BookQuery) -> Markup {
    let selected_category = query.category.as_deref().unwrap_or_default();
    let selected_author = query.author.as_deref().unwrap_or_default();
    html! {
        form method="get" action="/books" {
            label {
                "Category "
                select name="category" {
                    option value="" { "Any" }
                    @for category in &filters.categories {
                        option value=(category) selected[category == selected_category] { (category) }
                    }
                }
            }
            label {
                " Author "
                select name="author" {
                    option value="" { "Any" }
                    @for author in &filters.authors {
                        option value=(author) selected[author == selected_author] { (author) }
                    }
                }
            }
            label {
                " Year "
                select name="year" {
                    option value="" { "Any" }
                    @for year in &filters.years {
                        option value=(year) selected[query.year == Some(*year)] { (year) }
                    }
                }
            }
            " "
            button type="submit" { "Filter" }
        }
    }
}

pub async fn catalog(
    State(state): State<AppState>,
    Query(form): Query<CatalogForm>,
) -> PageResult<Markup> {
    let query = BookQuery::from(form);
    let filters = book_service::book_filters(&state).await?.data.unwrap_or_default();
    let form = filter_form(&filters, &query);
    let books = book_service::list_books(&state, query)
        .await?
        .data
        .map(|list| list.items)
        .unwrap_or_default();

    Ok(layout(
        "Catalog",
        html! {
            h1 { "Catalog" }
            (form)
            p { (books.len()) " books" }
            @for book in &books {
                (book_card(book))
            }
        },
    ))
}

fn order_forms(book: &Book) -> Markup {
    html! {
        form method="post" action={ "/books/" (book.id) "/cart" } {
            label {
                "Quantity "
                input type="number" name="quantity" value="1" min="1" required;
            }
            " "
            button type="submit" { "Add to cart" }
        }
        form method="post" action={ "/books/" (book.id) "/rent" } {
            label {
                "Rental period "
                select name="rental_period" {
                    @for period in RentalPeriod::ALL {
                        option value=(period.as_str()) { (period.as_str()) " (" (period.days()) " days)" }
                    }
                }
            }
            " "
            button type="submit" { "Rent" }
        }
    }
}

pub async fn book_detail(
    State(state): State<AppState>,
    PagePath(id): PagePath<Uuid>,
) -> PageResult<Markup> {
    let book = book_service::get_book(&state, id).await?.data;
    let Some(book) = book else {
        return Err(AppError::NotFound.into());
    };

    Ok(layout(
        &book.title,
        html! {
            article.book-detail {
                @if let Some(url) = &book.image_url {
                    img src=(url) alt=(book.title) width="240";
                }
                h1 { (book.title) }
                p { "by " (book.author) }
                dl {
                    dt { "Category" } dd { a href=(category_href(&book.category)) { (book.category) } }
                    dt { "Year" } dd { (book.year) }
                    dt { "Price" } dd { (book.price) }
                    dt { "Rental price" } dd { (book.rental_price) }
                }
                p { (book.description) }
                @if book.is_available {
                    (order_forms(&book))
                } @else {
                    p { "This book is currently unavailable." }
                }
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> Book {
        Book {
            id: Uuid::nil(),
            title: "1984".into(),
            author: "George Orwell".into(),
            category: "Fiction".into(),
            year: 1949,
            description: "Dystopia".into(),
            price: 650,
            rental_price: 120,
            image_url: None,
            is_available: true,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn blank_year_is_ignored() {
        let query = BookQuery::from(CatalogForm {
            category: Some("Fiction".into()),
            author: None,
            year: Some("".into()),
        });
        assert_eq!(query.year, None);
        assert_eq!(query.category.as_deref(), Some("Fiction"));
    }

    #[test]
    fn card_links_to_detail_page() {
        let html = book_card(&book()).into_string();
        assert!(html.contains(&format!("/books/{}", Uuid::nil())));
        assert!(html.contains("George Orwell"));
    }

    #[test]
    fn category_link_is_url_encoded() {
        assert_eq!(
            category_href("Sci-Fi & Fantasy"),
            "/books?category=Sci-Fi%20%26%20Fantasy"
        );
        assert_eq!(category_href("a+b?c#d"), "/books?category=a%2Bb%3Fc%23d");
    }

    #[test]
    fn detail_forms_post_to_book_routes() {
        let html = order_forms(&book()).into_string();
        let id = Uuid::nil();
        assert!(html.contains(&format!("action=\"/books/{id}/cart\"")));
        assert!(html.contains(&format!("action=\"/books/{id}/rent\"")));
        for period in RentalPeriod::ALL {
            assert!(html.contains(&format!("value=\"{}\"", period.as_str())));
        }
    }
}
