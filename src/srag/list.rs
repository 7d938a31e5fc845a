use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::database::{SragQuery, SragStore};
use super::error::SragError;
use super::record::SragRecord;

pub const DEFAULT_ITEMS_PER_PAGE: i64 = 20;

/// Query parameters of the list endpoint. Names follow the DataSUS columns.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilters {
    pub page: Option<i64>,
    pub items_per_page: Option<i64>,
    pub sg_uf: Option<String>,
    pub co_mun_res: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub evolucao: Option<i32>,
    pub uti: Option<i32>,
    pub vacina_cov: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub items_per_page: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: i64, items_per_page: i64, total: i64) -> Self {
        let total_pages = if total > 0 { (total - 1) / items_per_page + 1 } else { 0 };
        Self {
            page,
            items_per_page,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SragPage {
    pub data: Vec<SragRecord>,
    pub pagination: Pagination,
}

impl ListFilters {
    /// Filter part of the query, without paging
    pub fn to_query(&self) -> SragQuery {
        let non_empty = |v: &Option<String>| v.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        SragQuery {
            state_code: non_empty(&self.sg_uf),
            municipality_code: non_empty(&self.co_mun_res),
            outcome: self.evolucao,
            icu: self.uti,
            vaccinated: self.vacina_cov,
            onset_between: self.start_date.zip(self.end_date),
            ..SragQuery::default()
        }
    }

    /// Validated `(page, items_per_page, offset)`
    fn page_and_size(&self, default_items_per_page: i64) -> Result<(i64, i64, i64), SragError> {
        let page = self.page.unwrap_or(1);
        let items_per_page = self.items_per_page.unwrap_or(default_items_per_page);
        if page < 1 {
            return Err(SragError::InvalidPagination(format!("page must be >= 1, got {page}")));
        }
        if items_per_page < 1 {
            return Err(SragError::InvalidPagination(format!(
                "itemsPerPage must be >= 1, got {items_per_page}"
            )));
        }
        let offset = (page - 1).checked_mul(items_per_page).ok_or_else(|| {
            SragError::InvalidPagination(format!("page {page} with itemsPerPage {items_per_page} is out of range"))
        })?;
        Ok((page, items_per_page, offset))
    }
}

pub async fn get_srag_list(
    store: &dyn SragStore,
    filters: &ListFilters,
    default_items_per_page: i64,
) -> Result<SragPage, SragError> {
    let (page, items_per_page, offset) = filters.page_and_size(default_items_per_page)?;
    let filter_query = filters.to_query();
    let page_query = SragQuery {
        newest_first: true,
        offset: Some(offset),
        limit: Some(items_per_page),
        ..filter_query.clone()
    };

    let (data, total) = futures::try_join!(store.find_many(&page_query), store.count(&filter_query)).map_err(|e| {
        tracing::error!("List query failed: {}", e);
        SragError::List(e)
    })?;

    Ok(SragPage { data, pagination: Pagination::new(page, items_per_page, total) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_math() {
        let p = Pagination::new(2, 10, 25);
        assert_eq!((p.total_pages, p.has_next, p.has_prev), (3, true, true));

        let last = Pagination::new(3, 10, 25);
        assert!(!last.has_next);

        let empty = Pagination::new(1, 20, 0);
        assert_eq!((empty.total_pages, empty.has_next, empty.has_prev), (0, false, false));
    }

    #[test]
    fn pagination_serializes_camel_case() {
        let json = serde_json::to_value(Pagination::new(1, 20, 40)).unwrap();
        assert_eq!(json["itemsPerPage"], 20);
        assert_eq!(json["totalPages"], 2);
        assert_eq!(json["hasNext"], true);
    }

    #[test]
    fn filters_map_to_query() {
        let filters = ListFilters {
            sg_uf: Some(" SP ".into()),
            co_mun_res: Some(String::new()),
            evolucao: Some(2),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..Default::default()
        };
        let query = filters.to_query();
        assert_eq!(query.state_code.as_deref(), Some("SP"));
        assert_eq!(query.municipality_code, None);
        assert_eq!(query.outcome, Some(2));
        assert_eq!(query.onset_between, None);
    }

    #[test]
    fn rejects_non_positive_paging() {
        let zero_page = ListFilters { page: Some(0), ..Default::default() };
        assert!(matches!(zero_page.page_and_size(20), Err(SragError::InvalidPagination(_))));
        let zero_size = ListFilters { items_per_page: Some(0), ..Default::default() };
        assert!(matches!(zero_size.page_and_size(20), Err(SragError::InvalidPagination(_))));
        assert_eq!(ListFilters::default().page_and_size(20).unwrap(), (1, 20, 0));
    }

    #[test]
    fn extreme_paging_values_do_not_overflow() {
        let p = Pagination::new(1, i64::MAX, 5);
        assert_eq!((p.total_pages, p.has_next), (1, false));
        let p = Pagination::new(i64::MAX, 1, i64::MAX);
        assert_eq!((p.total_pages, p.has_next, p.has_prev), (i64::MAX, false, true));

        let huge = ListFilters { page: Some(i64::MAX), items_per_page: Some(i64::MAX), ..Default::default() };
        assert!(matches!(huge.page_and_size(20), Err(SragError::InvalidPagination(_))));
        let huge_page = ListFilters { page: Some(i64::MAX), items_per_page: Some(2), ..Default::default() };
        assert!(matches!(huge_page.page_and_size(20), Err(SragError::InvalidPagination(_))));

        let first_page = ListFilters { page: Some(1), items_per_page: Some(i64::MAX), ..Default::default() };
        assert_eq!(first_page.page_and_size(20).unwrap(), (1, i64::MAX, 0));
    }
}
