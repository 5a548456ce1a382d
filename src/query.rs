use std::fmt;
use std::str::FromStr;

use url::form_urlencoded;

use crate::api::{ApiClient, ApiError};
use crate::models::{Issue, IssuePriority, IssueStatus};

/// Matches the server default for `limit`.
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreatedAt,
    Priority,
    Status,
}

pub const VALID_SORT_KEYS: [&str; 3] = ["created_at", "priority", "status"];

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::Priority => "priority",
            SortKey::Status => "status",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "created_at" => Ok(SortKey::CreatedAt),
            "priority" => Ok(SortKey::Priority),
            "status" => Ok(SortKey::Status),
            _ => Err(format!(
                "Invalid sort key '{}'. Must be one of: {}",
                value,
                VALID_SORT_KEYS.join(", ")
            )),
        }
    }
}

/// Absent fields stay out of the query string entirely; an empty search
/// string counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilters {
    pub search: Option<String>,
    pub status: Option<IssueStatus>,
    pub priority: Option<IssuePriority>,
    pub assignee: Option<i64>,
}

impl IssueFilters {
    pub fn is_empty(&self) -> bool {
        self == &IssueFilters::default()
    }
}

/// Filter/sort/pagination state for one project's issue listing. Mutated
/// only through [`apply`](IssueQuery::apply) and the page movers, so a
/// stale offset can never ride along with fresh filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueQuery {
    filters: IssueFilters,
    sort: SortKey,
    page: usize,
}

impl IssueQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &IssueFilters {
        &self.filters
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Replaces the filters and sort, dropping back to the first page.
    pub fn apply(&mut self, filters: IssueFilters, sort: SortKey) {
        self.filters = filters;
        self.sort = sort;
        self.page = 0;
    }

    pub fn next_page(&mut self) {
        self.page += 1;
    }

    /// No-op on the first page.
    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// Builds the wire query: optional fields only when set, `sort`,
    /// `limit`, and `offset` always.
    pub fn query_string(&self, page_size: usize) -> String {
        let mut params = form_urlencoded::Serializer::new(String::new());
        if let Some(search) = &self.filters.search {
            if !search.is_empty() {
                params.append_pair("q", search);
            }
        }
        if let Some(status) = self.filters.status {
            params.append_pair("status", status.as_str());
        }
        if let Some(priority) = self.filters.priority {
            params.append_pair("priority", priority.as_str());
        }
        if let Some(assignee) = self.filters.assignee {
            params.append_pair("assignee", &assignee.to_string());
        }
        params.append_pair("sort", self.sort.as_str());
        params.append_pair("limit", &page_size.to_string());
        params.append_pair("offset", &(self.page * page_size).to_string());
        params.finish()
    }

    /// Runs the query. `has_next_page` is the full-page heuristic: the
    /// server exposes no total count, so a page of exactly `page_size`
    /// rows is read as "more may exist". Off by one page boundary when
    /// the true total is an exact multiple of `page_size`.
    pub async fn load(
        &self,
        client: &ApiClient,
        project_id: i64,
        page_size: usize,
    ) -> Result<IssuePage, ApiError> {
        let issues = client
            .issues(project_id, &self.query_string(page_size))
            .await?;
        let has_next_page = issues.len() == page_size;
        Ok(IssuePage {
            issues,
            has_next_page,
        })
    }
}

#[derive(Debug, Clone)]
pub struct IssuePage {
    pub issues: Vec<Issue>,
    pub has_next_page: bool,
}
