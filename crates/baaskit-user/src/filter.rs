//! Query criteria for list endpoints

use serde::{Deserialize, Serialize};

/// Server-side filtering and paging for user lists
///
/// `where_clause` is evaluated by the server with `params` bound to its `?` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    pub where_clause: Option<String>,
    pub params: Vec<String>,
    pub order_by: Option<String>,
    pub page: Option<u32>,
    pub records_per_page: Option<u32>,
    pub skip: Option<u32>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_clause(mut self, clause: impl Into<String>, params: Vec<String>) -> Self {
        self.where_clause = Some(clause.into());
        self.params = params;
        self
    }

    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order_by = Some(order.into());
        self
    }

    pub fn page(mut self, page: u32, records_per_page: u32) -> Self {
        self.page = Some(page);
        self.records_per_page = Some(records_per_page);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Query parameters in a stable order; `params` repeats once per value
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(clause) = &self.where_clause {
            query.push(("where".to_string(), clause.clone()));
            query.extend(self.params.iter().map(|p| ("params".to_string(), p.clone())));
        }
        if let Some(order) = &self.order_by {
            query.push(("orderBy".to_string(), order.clone()));
        }
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.to_string()));
        }
        if let Some(rpp) = self.records_per_page {
            query.push(("recordsPerPage".to_string(), rpp.to_string()));
        }
        if let Some(skip) = self.skip {
            query.push(("skip".to_string(), skip.to_string()));
        }
        query
    }
}
