use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::Book,
};

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    pub category: Option<String>,
    pub author: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NewArrivalsQuery {
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct BookList {
    #[schema(value_type = Vec<Book>)]
    pub items: Vec<Book>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct BookFilters {
    pub categories: Vec<String>,
    pub authors: Vec<String>,
    pub years: Vec<i32>,
}

/// Body of admin create/replace/patch requests. Fields are optional so that a
/// missing one is reported by name instead of failing deserialization.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct BookPayload {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub rental_price: Option<i64>,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub category: String,
    pub year: i32,
    pub description: String,
    pub price: i64,
    pub rental_price: i64,
    pub image_url: Option<String>,
    pub is_available: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub rental_price: Option<i64>,
    /// `Some(None)` clears the image.
    pub image_url: Option<Option<String>>,
    pub is_available: Option<bool>,
}

impl BookPayload {
    /// Validate a full book definition (create and PUT).
    pub fn into_new_book(self) -> AppResult<NewBook> {
        Ok(NewBook {
            title: text("title", required("title", self.title)?)?,
            author: text("author", required("author", self.author)?)?,
            category: text("category", required("category", self.category)?)?,
            year: year(required("year", self.year)?)?,
            description: text("description", required("description", self.description)?)?,
            price: amount("price", required("price", self.price)?)?,
            rental_price: amount("rental_price", required("rental_price", self.rental_price)?)?,
            image_url: image_url(self.image_url),
            is_available: self.is_available.unwrap_or(true),
        })
    }

    /// Validate only the fields that are present (PATCH).
    pub fn into_patch(self) -> AppResult<BookPatch> {
        Ok(BookPatch {
            title: self.title.map(|v| text("title", v)).transpose()?,
            author: self.author.map(|v| text("author", v)).transpose()?,
            category: self.category.map(|v| text("category", v)).transpose()?,
            year: self.year.map(year).transpose()?,
            description: self
                .description
                .map(|v| text("description", v))
                .transpose()?,
            price: self.price.map(|v| amount("price", v)).transpose()?,
            rental_price: self
                .rental_price
                .map(|v| amount("rental_price", v))
                .transpose()?,
            image_url: self.image_url.map(|v| image_url(Some(v))),
            is_available: self.is_available,
        })
    }
}

fn required<T>(field: &str, value: Option<T>) -> AppResult<T> {
    value.ok_or_else(|| AppError::BadRequest(format!("field '{field}' is required")))
}

fn text(field: &str, value: String) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("field '{field}' is required")));
    }
    Ok(trimmed.to_string())
}

fn year(value: i32) -> AppResult<i32> {
    if value <= 0 {
        return Err(AppError::BadRequest("year must be positive".into()));
    }
    Ok(value)
}

fn amount(field: &str, value: i64) -> AppResult<i64> {
    if value < 0 {
        return Err(AppError::BadRequest(format!("{field} must not be negative")));
    }
    Ok(value)
}

fn image_url(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_payload() -> BookPayload {
        BookPayload {
            title: Some("1984".into()),
            author: Some("George Orwell".into()),
            category: Some("Fiction".into()),
            year: Some(1949),
            description: Some("Dystopia".into()),
            price: Some(650),
            rental_price: Some(120),
            image_url: Some("".into()),
            is_available: None,
        }
    }

    #[test]
    fn full_payload_defaults() {
        let book = full_payload().into_new_book().unwrap();
        assert!(book.is_available);
        assert_eq!(book.image_url, None);
        assert_eq!(book.price, 650);
    }

    #[test]
    fn missing_field_is_named() {
        let payload = BookPayload {
            rental_price: None,
            ..full_payload()
        };
        match payload.into_new_book() {
            Err(AppError::BadRequest(msg)) => assert!(msg.contains("rental_price")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn negative_price_rejected() {
        let payload = BookPayload {
            price: Some(-1),
            ..full_payload()
        };
        assert!(matches!(
            payload.into_new_book(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn blank_title_rejected() {
        let payload = BookPayload {
            title: Some("   ".into()),
            ..full_payload()
        };
        assert!(payload.into_new_book().is_err());
    }

    #[test]
    fn patch_keeps_absent_fields_untouched() {
        let patch = BookPayload {
            price: Some(700),
            image_url: Some(" ".into()),
            ..BookPayload::default()
        }
        .into_patch()
        .unwrap();
        assert_eq!(patch.price, Some(700));
        assert_eq!(patch.image_url, Some(None));
        assert_eq!(patch.title, None);
        assert_eq!(patch.is_available, None);
    }

    #[test]
    fn patch_validates_present_fields() {
        let result = BookPayload {
            year: Some(0),
            ..BookPayload::default()
        }
        .into_patch();
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
