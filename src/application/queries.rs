use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ChartMode;

/// Base trait for all queries
pub trait Query: Send + Sync {
    fn query_id(&self) -> &str;
    fn timestamp(&self) -> DateTime<Utc>;
    fn node_id(&self) -> Option<&str>;
}

/// Query to list the immediate children of a node, paginated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListChildrenQuery {
    pub query_id: String,
    pub timestamp: DateTime<Utc>,
    pub parent_id: String,
    pub page: u32,
    pub page_size: u32,
    pub name_filter: Option<String>,
    pub include_inactive: bool,
    pub sort_order: Option<SortOrder>,
}

/// Query to render an organizational chart from a root node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildChartQuery {
    pub query_id: String,
    pub timestamp: DateTime<Utc>,
    pub root_id: String,
    pub mode: ChartMode,
}

/// Sort order enum
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Query factory for creating queries with proper defaults
pub struct QueryFactory;

impl QueryFactory {
    pub fn list_children(
        parent_id: String,
        page: u32,
        page_size: u32,
        name_filter: Option<String>,
        include_inactive: bool,
        sort_order: Option<SortOrder>,
    ) -> ListChildrenQuery {
        ListChildrenQuery {
            query_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            parent_id,
            page,
            page_size,
            name_filter,
            include_inactive,
            sort_order,
        }
    }

    pub fn build_chart(root_id: String, mode: ChartMode) -> BuildChartQuery {
        BuildChartQuery {
            query_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            root_id,
            mode,
        }
    }
}

/// Implement Query trait for all queries
impl Query for ListChildrenQuery {
    fn query_id(&self) -> &str {
        &self.query_id
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
    fn node_id(&self) -> Option<&str> {
        Some(&self.parent_id)
    }
}

impl Query for BuildChartQuery {
    fn query_id(&self) -> &str {
        &self.query_id
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
    fn node_id(&self) -> Option<&str> {
        Some(&self.root_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total_count: u64, page: u32, page_size: u32) -> Self {
        let total_pages = (total_count as f64 / page_size as f64).ceil() as u32;
        let has_next = page < total_pages;
        let has_previous = page > 1;

        Self {
            items,
            total_count,
            page,
            page_size,
            total_pages,
            has_next,
            has_previous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_children_query_creation() {
        let query = QueryFactory::list_children(
            "node-1".to_string(),
            1,
            10,
            Some("sales".to_string()),
            false,
            Some(SortOrder::Asc),
        );

        assert_eq!(query.parent_id, "node-1");
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 10);
        assert_eq!(query.name_filter, Some("sales".to_string()));
        assert!(!query.include_inactive);
        assert_eq!(query.sort_order, Some(SortOrder::Asc));
        assert!(!query.query_id.is_empty());
    }

    #[test]
    fn test_build_chart_query_creation() {
        let query = QueryFactory::build_chart("root-1".to_string(), ChartMode::Functional);

        assert_eq!(query.root_id, "root-1");
        assert_eq!(query.mode, ChartMode::Functional);
        assert!(!query.query_id.is_empty());
    }

    #[test]
    fn test_query_trait_implementation() {
        let query = QueryFactory::build_chart("root-1".to_string(), ChartMode::Local);

        assert!(!query.query_id().is_empty());
        assert!(query.timestamp() <= Utc::now());
        assert_eq!(query.node_id(), Some("root-1"));
    }

    #[test]
    fn test_paginated_result() {
        let items = vec![1, 2, 3, 4, 5];
        let result = PaginatedResult::new(items, 25, 1, 10);

        assert_eq!(result.items.len(), 5);
        assert_eq!(result.total_count, 25);
        assert_eq!(result.page, 1);
        assert_eq!(result.page_size, 10);
        assert_eq!(result.total_pages, 3);
        assert!(result.has_next);
        assert!(!result.has_previous);
    }

    #[test]
    fn test_paginated_result_last_page() {
        let items = vec![1, 2];
        let result = PaginatedResult::new(items, 12, 2, 10);

        assert_eq!(result.total_pages, 2);
        assert!(!result.has_next);
        assert!(result.has_previous);
    }
}
