use anyhow::{anyhow, bail, Result};

use issuehub::api::ApiClient;
use issuehub::auth::{is_maintainer, role_for};
use issuehub::models::{
    Comment, Issue, IssuePatch, IssuePriority, IssueStatus, NewIssue, ProjectMembership,
};
use issuehub::notify::{NotificationKind, NotificationQueue};
use issuehub::query::{IssueFilters, IssuePage, IssueQuery, SortKey, DEFAULT_PAGE_SIZE};

use crate::commands::account;

pub struct ListOptions {
    pub search: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub sort: String,
    pub page: usize,
    pub page_size: usize,
}

pub async fn list(client: &ApiClient, project_id: i64, options: ListOptions) -> Result<()> {
    account::require_session(client)?;
    let query = build_query(&options)?;
    let page = query.load(client, project_id, options.page_size).await?;
    let members = client.members(project_id).await?;
    print_listing(&page, &query, &members);
    Ok(())
}

pub async fn create(
    client: &ApiClient,
    notifier: &NotificationQueue,
    project_id: i64,
    title: &str,
    description: Option<String>,
    priority: &str,
    assignee: Option<&str>,
) -> Result<()> {
    let priority: IssuePriority = priority.parse().map_err(anyhow::Error::msg)?;
    let assignee_id = parse_assignee(assignee)?;

    let me = account::current_user(client).await?;
    let members = client.members(project_id).await?;
    if !is_maintainer(&members, me.id) {
        bail!("Maintainer role required to create issues");
    }
    if let Some(assignee) = assignee_id {
        if role_for(&members, assignee).is_none() {
            bail!("Assignee must be a project member");
        }
    }

    let issue = client
        .create_issue(
            project_id,
            &NewIssue {
                title: title.to_string(),
                description,
                priority,
                assignee_id,
            },
        )
        .await?;
    notifier.push("Issue created", NotificationKind::Success);
    println!("Created issue #{}", issue.id);

    // Reload the listing with the state captured before the mutation.
    let query = IssueQuery::new();
    let page = query.load(client, project_id, DEFAULT_PAGE_SIZE).await?;
    print_listing(&page, &query, &members);
    Ok(())
}

pub async fn show(client: &ApiClient, issue_id: i64) -> Result<()> {
    account::require_session(client)?;
    let issue = client.issue(issue_id).await?;
    let comments = client.comments(issue_id).await?;
    let members = client.members(issue.project_id).await?;
    print_issue(&issue, &comments, &members);
    Ok(())
}

pub async fn update(
    client: &ApiClient,
    notifier: &NotificationQueue,
    issue_id: i64,
    status: Option<&str>,
    assignee: Option<&str>,
) -> Result<()> {
    let mut patch = IssuePatch::default();
    if let Some(raw) = status {
        patch.status = Some(raw.parse::<IssueStatus>().map_err(anyhow::Error::msg)?);
    }
    if let Some(raw) = assignee {
        patch.assignee_id = Some(parse_assignee(Some(raw))?);
    }
    if patch.is_empty() {
        bail!("Nothing to update. Use --status or --assignee");
    }

    account::require_session(client)?;
    let issue = client.issue(issue_id).await?;
    let me = account::current_user(client).await?;
    let members = client.members(issue.project_id).await?;
    if !is_maintainer(&members, me.id) {
        bail!("Maintainer role required to change status or assignee");
    }

    client.update_issue(issue_id, &patch).await?;
    notifier.push("Issue updated", NotificationKind::Success);

    // Full reload of the issue view.
    let issue = client.issue(issue_id).await?;
    let comments = client.comments(issue_id).await?;
    let members = client.members(issue.project_id).await?;
    print_issue(&issue, &comments, &members);
    Ok(())
}

fn build_query(options: &ListOptions) -> Result<IssueQuery> {
    let status = match options.status.as_deref() {
        Some(raw) if !raw.is_empty() => {
            Some(raw.parse::<IssueStatus>().map_err(anyhow::Error::msg)?)
        }
        _ => None,
    };
    let priority = match options.priority.as_deref() {
        Some(raw) if !raw.is_empty() => {
            Some(raw.parse::<IssuePriority>().map_err(anyhow::Error::msg)?)
        }
        _ => None,
    };
    let sort: SortKey = options.sort.parse().map_err(anyhow::Error::msg)?;
    let filters = IssueFilters {
        search: options.search.clone().filter(|value| !value.is_empty()),
        status,
        priority,
        assignee: parse_assignee(options.assignee.as_deref())?,
    };

    let mut query = IssueQuery::new();
    query.apply(filters, sort);
    query.set_page(options.page);
    Ok(query)
}

/// An empty id means "unassigned" and maps to no filter (or a null wire
/// value); anything else must be a user id.
fn parse_assignee(raw: Option<&str>) -> Result<Option<i64>> {
    match raw {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| anyhow!("Invalid assignee '{}'. Must be a user id", value)),
    }
}

fn member_name(members: &[ProjectMembership], user_id: i64) -> String {
    members
        .iter()
        .find(|member| member.user_id == user_id)
        .map(|member| member.name.clone())
        .unwrap_or_else(|| format!("User {user_id}"))
}

pub(super) fn print_listing(page: &IssuePage, query: &IssueQuery, members: &[ProjectMembership]) {
    if page.issues.is_empty() {
        println!("No issues found.");
    }
    for issue in &page.issues {
        let assignee = issue
            .assignee_id
            .map(|id| member_name(members, id))
            .unwrap_or_else(|| "Unassigned".to_string());
        println!(
            "#{:<4} [{:<11}] {:<40} {:8} {:<16} {}",
            issue.id,
            issue.status,
            truncate(&issue.title, 40),
            issue.priority,
            truncate(&assignee, 16),
            issue.created_at.format("%Y-%m-%d")
        );
    }
    println!(
        "Page {}{}",
        query.page() + 1,
        if page.has_next_page {
            " (more available)"
        } else {
            ""
        }
    );
}

pub(super) fn print_issue(issue: &Issue, comments: &[Comment], members: &[ProjectMembership]) {
    println!("Issue #{}: {}", issue.id, issue.title);
    println!("Status: {}", issue.status);
    println!("Priority: {}", issue.priority);
    println!("Reporter: {}", member_name(members, issue.reporter_id));
    match issue.assignee_id {
        Some(id) => println!("Assignee: {}", member_name(members, id)),
        None => println!("Assignee: Unassigned"),
    }
    println!("Created: {}", issue.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Updated: {}", issue.updated_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(description) = &issue.description {
        if !description.is_empty() {
            println!("\nDescription:");
            for line in description.lines() {
                println!("  {}", line);
            }
        }
    }

    println!("\nComments:");
    if comments.is_empty() {
        println!("  (none)");
    }
    for comment in comments {
        println!(
            "  [{}] {}: {}",
            comment.created_at.format("%Y-%m-%d %H:%M"),
            member_name(members, comment.author_id),
            comment.body
        );
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", truncated)
    }
}
