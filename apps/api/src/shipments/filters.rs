use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::shipment::ShipmentRecord;
use crate::shipments::status::CanonicalStatus;
use crate::shipments::view::ShipmentView;

pub const MAX_PAGE_SIZE: u32 = 100;

/// Query string accepted by the list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<CanonicalStatus>,
    pub search: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    #[serde(alias = "per_page")]
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: usize,
    pub total_pages: u32,
}

impl ListQuery {
    pub fn check(&self) -> Result<(), AppError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(AppError::Validation(format!(
                    "date range is empty: from {from} is after to {to}"
                )));
            }
        }
        Ok(())
    }

    fn matches<R: ShipmentRecord>(&self, view: &ShipmentView<R>) -> bool {
        if let Some(status) = self.status {
            if view.canonical_status != status {
                return false;
            }
        }

        if let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = needle.to_lowercase();
            let hit = view
                .record
                .searchable()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if self.from.is_some() || self.to.is_some() {
            // Undated shipments are excluded once any bound is given.
            let Some(date) = view.record.shipment_date() else {
                return false;
            };
            if self.from.is_some_and(|from| date < from) || self.to.is_some_and(|to| date > to) {
                return false;
            }
        }

        true
    }
}

/// Filters `views` (already ordered) and cuts out the requested page.
pub fn filter_and_paginate<R: ShipmentRecord>(
    views: Vec<ShipmentView<R>>,
    query: &ListQuery,
    default_page_size: u32,
) -> Page<ShipmentView<R>> {
    let per_page = query
        .per_page
        .unwrap_or(default_page_size)
        .clamp(1, MAX_PAGE_SIZE);
    let page = query.page.unwrap_or(1).max(1);

    let matching: Vec<_> = views.into_iter().filter(|v| query.matches(v)).collect();
    let total = matching.len();
    let total_pages = total.div_ceil(per_page as usize) as u32;

    let items = matching
        .into_iter()
        .skip((page as usize - 1) * per_page as usize)
        .take(per_page as usize)
        .collect();

    Page {
        items,
        page,
        per_page,
        total,
        total_pages,
    }
}
