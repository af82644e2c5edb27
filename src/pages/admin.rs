use std::str::FromStr;

use axum::{extract::State, response::Redirect};
use chrono::Utc;
use maud::{Markup, html};
use serde::Deserialize;
use uuid::Uuid;

use super::{PageAdmin, PageForm, PagePath, PageResult, layout, post_button};
use crate::{
    dto::{admin::AdminRental, books::BookPayload},
    error::{AppError, AppResult},
    models::Book,
    services::{admin_service, book_service, rental_service},
    state::AppState,
};

/// Book editor fields as posted by the browser. Numbers arrive as text and the
/// availability checkbox is only sent when ticked.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub category: String,
    pub year: String,
    pub description: String,
    pub price: String,
    pub rental_price: String,
    pub image_url: String,
    pub is_available: Option<String>,
}

impl BookForm {
    pub fn into_payload(self) -> AppResult<BookPayload> {
        Ok(BookPayload {
            title: Some(self.title),
            author: Some(self.author),
            category: Some(self.category),
            year: number("year", &self.year)?,
            description: Some(self.description),
            price: number("price", &self.price)?,
            rental_price: number("rental_price", &self.rental_price)?,
            image_url: Some(self.image_url),
            is_available: Some(self.is_available.is_some()),
        })
    }
}

fn number<T: FromStr>(field: &str, value: &str) -> AppResult<Option<T>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| AppError::BadRequest(format!("field '{field}' must be a whole number")))
}

fn admin_nav() -> Markup {
    html! {
        p {
            a href="/admin" { "Dashboard" }
            " · "
            a href="/admin/books" { "Books" }
            " · "
            a href="/admin/rentals" { "Rentals" }
        }
    }
}

pub async fn dashboard(
    State(state): State<AppState>,
    PageAdmin(admin): PageAdmin,
) -> PageResult<Markup> {
    let stats = admin_service::stats(&state, &admin, Utc::now())
        .await?
        .data
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("stats missing")))?;

    Ok(layout(
        "Admin",
        html! {
            h1 { "Admin dashboard" }
            (admin_nav())
            dl {
                dt { "Books" } dd { (stats.total_books) }
                dt { "Users" } dd { (stats.total_users) }
                dt { "Active rentals" } dd { (stats.active_rentals) }
                dt { "Orders this month" } dd { (stats.orders_this_month) }
            }
            (post_button("/admin/rental-reminders", "Send rental reminders"))
        },
    ))
}

pub async fn send_reminders(
    State(state): State<AppState>,
    PageAdmin(admin): PageAdmin,
) -> PageResult<Markup> {
    let summary = rental_service::send_reminders(&state, &admin, Utc::now())
        .await?
        .data
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("reminder summary missing")))?;

    Ok(layout(
        "Rental reminders",
        html! {
            h1 { "Rental reminders" }
            (admin_nav())
            p { "Upcoming: " (summary.upcoming) }
            p { "Overdue: " (summary.overdue) }
            p { "Flagged in total: " (summary.total) }
        },
    ))
}

fn book_row(book: &Book) -> Markup {
    html! {
        tr {
            td { a href={ "/books/" (book.id) } { (book.title) } }
            td { (book.author) }
            td { (book.category) }
            td { (book.price) }
            td { (book.rental_price) }
            td { @if book.is_available { "yes" } @else { "no" } }
            td {
                a href={ "/admin/books/" (book.id) "/edit" } { "Edit" }
                " "
                (post_button(&format!("/admin/books/{}/delete", book.id), "Delete"))
            }
        }
    }
}

pub async fn books(
    State(state): State<AppState>,
    PageAdmin(admin): PageAdmin,
) -> PageResult<Markup> {
    let books = book_service::list_all_books(&state, &admin)
        .await?
        .data
        .map(|list| list.items)
        .unwrap_or_default();

    Ok(layout(
        "Manage books",
        html! {
            h1 { "Books" }
            (admin_nav())
            p { a href="/admin/books/new" { "Add a book" } }
            table {
                thead {
                    tr {
                        th { "Title" } th { "Author" } th { "Category" }
                        th { "Price" } th { "Rental" } th { "Available" } th {}
                    }
                }
                tbody {
                    @for book in &books {
                        (book_row(book))
                    }
                }
            }
        },
    ))
}

fn book_form(action: &str, book: Option<&Book>) -> Markup {
    let title = book.map(|b| b.title.as_str()).unwrap_or_default();
    let author = book.map(|b| b.author.as_str()).unwrap_or_default();
    let category = book.map(|b| b.category.as_str()).unwrap_or_default();
    let description = book.map(|b| b.description.as_str()).unwrap_or_default();
    let image_url = book.and_then(|b| b.image_url.as_deref()).unwrap_or_default();
    let year = book.map(|b| b.year.to_string()).unwrap_or_default();
    let price = book.map(|b| b.price.to_string()).unwrap_or_default();
    let rental_price = book.map(|b| b.rental_price.to_string()).unwrap_or_default();
    let available = book.is_none_or(|b| b.is_available);
    html! {
        form method="post" action=(action) {
            p { label { "Title " input name="title" value=(title) required; } }
            p { label { "Author " input name="author" value=(author) required; } }
            p { label { "Category " input name="category" value=(category) required; } }
            p { label { "Year " input type="number" name="year" min="1" value=(year) required; } }
            p { label { "Description " textarea name="description" required { (description) } } }
            p { label { "Price " input type="number" name="price" min="0" value=(price) required; } }
            p { label { "Rental price " input type="number" name="rental_price" min="0" value=(rental_price) required; } }
            p { label { "Image URL " input type="url" name="image_url" value=(image_url); } }
            p { label { input type="checkbox" name="is_available" checked[available]; " Available" } }
            button type="submit" { "Save" }
        }
    }
}

pub async fn new_book(PageAdmin(_admin): PageAdmin) -> Markup {
    layout(
        "New book",
        html! {
            h1 { "New book" }
            (admin_nav())
            (book_form("/admin/books", None))
        },
    )
}

pub async fn create_book(
    State(state): State<AppState>,
    PageAdmin(admin): PageAdmin,
    PageForm(form): PageForm<BookForm>,
) -> PageResult<Redirect> {
    book_service::create_book(&state, &admin, form.into_payload()?).await?;
    Ok(Redirect::to("/admin/books"))
}

pub async fn edit_book(
    State(state): State<AppState>,
    PageAdmin(_admin): PageAdmin,
    PagePath(id): PagePath<Uuid>,
) -> PageResult<Markup> {
    let book = book_service::get_book(&state, id)
        .await?
        .data
        .ok_or(AppError::NotFound)?;

    Ok(layout(
        "Edit book",
        html! {
            h1 { "Edit " (book.title) }
            (admin_nav())
            (book_form(&format!("/admin/books/{}", book.id), Some(&book)))
        },
    ))
}

pub async fn update_book(
    State(state): State<AppState>,
    PageAdmin(admin): PageAdmin,
    PagePath(id): PagePath<Uuid>,
    PageForm(form): PageForm<BookForm>,
) -> PageResult<Redirect> {
    book_service::replace_book(&state, &admin, id, form.into_payload()?).await?;
    Ok(Redirect::to("/admin/books"))
}

pub async fn delete_book(
    State(state): State<AppState>,
    PageAdmin(admin): PageAdmin,
    PagePath(id): PagePath<Uuid>,
) -> PageResult<Redirect> {
    book_service::delete_book(&state, &admin, id).await?;
    Ok(Redirect::to("/admin/books"))
}

fn rental_row(entry: &AdminRental) -> Markup {
    let rental = &entry.rental;
    html! {
        tr {
            td { (entry.book.title) }
            td { (entry.user.name) " <" (entry.user.email) ">" }
            td { (rental.rental_period.as_str()) }
            td { (rental.end_date.format("%Y-%m-%d")) }
            td {
                @if rental.is_returned {
                    "Returned"
                } @else if entry.is_overdue {
                    strong { "Overdue" }
                } @else {
                    "Active"
                }
            }
            td { @if rental.reminder_sent { "reminded" } }
        }
    }
}

pub async fn rentals(
    State(state): State<AppState>,
    PageAdmin(admin): PageAdmin,
) -> PageResult<Markup> {
    let rentals = admin_service::list_rentals(&state, &admin, Utc::now())
        .await?
        .data
        .map(|list| list.items)
        .unwrap_or_default();

    Ok(layout(
        "All rentals",
        html! {
            h1 { "Rentals" }
            (admin_nav())
            table {
                thead {
                    tr {
                        th { "Book" } th { "Renter" } th { "Period" }
                        th { "Due" } th { "Status" } th {}
                    }
                }
                tbody {
                    @for entry in &rentals {
                        (rental_row(entry))
                    }
                }
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> BookForm {
        BookForm {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            category: "Science Fiction".into(),
            year: "1965".into(),
            description: "Desert planet".into(),
            price: "900".into(),
            rental_price: " 200 ".into(),
            image_url: "".into(),
            is_available: Some("on".into()),
        }
    }

    #[test]
    fn form_becomes_a_valid_book() {
        let book = filled().into_payload().unwrap().into_new_book().unwrap();
        assert_eq!(book.year, 1965);
        assert_eq!(book.rental_price, 200);
        assert_eq!(book.image_url, None);
        assert!(book.is_available);
    }

    #[test]
    fn unticked_checkbox_marks_unavailable() {
        let form = BookForm {
            is_available: None,
            ..filled()
        };
        let book = form.into_payload().unwrap().into_new_book().unwrap();
        assert!(!book.is_available);
    }

    #[test]
    fn blank_number_is_reported_as_missing() {
        let form = BookForm {
            price: "".into(),
            ..filled()
        };
        match form.into_payload().unwrap().into_new_book() {
            Err(AppError::BadRequest(msg)) => assert!(msg.contains("price")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn non_numeric_year_is_rejected() {
        let form = BookForm {
            year: "nineteen".into(),
            ..filled()
        };
        assert!(matches!(form.into_payload(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn edit_form_is_prefilled() {
        let book = Book {
            id: Uuid::nil(),
            title: "1984".into(),
            author: "George Orwell".into(),
            category: "Fiction".into(),
            year: 1949,
            description: "Dystopia".into(),
            price: 650,
            rental_price: 120,
            image_url: None,
            is_available: false,
            created_at: Utc::now(),
        };
        let html = book_form("/admin/books/x", Some(&book)).into_string();
        assert!(html.contains("value=\"George Orwell\""));
        assert!(html.contains("value=\"1949\""));
        assert!(!html.contains("checked"));

        let blank = book_form("/admin/books", None).into_string();
        assert!(blank.contains("checked"));
    }
}
