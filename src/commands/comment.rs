use anyhow::Result;

use issuehub::api::ApiClient;
use issuehub::notify::{NotificationKind, NotificationQueue};

use crate::commands::{account, issues};

pub async fn run(
    client: &ApiClient,
    notifier: &NotificationQueue,
    issue_id: i64,
    text: &str,
) -> Result<()> {
    account::require_session(client)?;
    client.add_comment(issue_id, text).await?;
    notifier.push("Comment added", NotificationKind::Success);

    // Reload the whole issue view so the new comment shows in context.
    issues::show(client, issue_id).await
}
