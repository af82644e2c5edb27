use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    /// `(page, per_page, offset)`. A page whose offset does not fit in `i64` is a bad request.
    pub fn normalize(&self) -> AppResult<(i64, i64, i64)> {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1)
            .checked_mul(per_page)
            .ok_or_else(|| AppError::BadRequest("page is out of range".to_string()))?;
        Ok((page, per_page, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        assert_eq!(Pagination::default().normalize().unwrap(), (1, 20, 0));
        let p = Pagination {
            page: Some(3),
            per_page: Some(500),
        };
        assert_eq!(p.normalize().unwrap(), (3, 100, 200));
        let p = Pagination {
            page: Some(-2),
            per_page: Some(0),
        };
        assert_eq!(p.normalize().unwrap(), (1, 1, 0));
    }

    #[test]
    fn huge_page_is_rejected() {
        let p = Pagination {
            page: Some(i64::MAX),
            per_page: None,
        };
        assert!(matches!(p.normalize(), Err(AppError::BadRequest(_))));

        let p = Pagination {
            page: Some(i64::MAX),
            per_page: Some(1),
        };
        assert_eq!(p.normalize().unwrap(), (i64::MAX, 1, i64::MAX - 1));
    }
}
