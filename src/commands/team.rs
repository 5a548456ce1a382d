use anyhow::{bail, Result};

use issuehub::api::ApiClient;
use issuehub::auth::{has_elevated_access_anywhere, is_maintainer, maintained_or_none};
use issuehub::models::{MemberInvite, MemberOnboard, ProjectMembership, Role};
use issuehub::notify::{NotificationKind, NotificationQueue};

use crate::commands::account;

pub async fn list(client: &ApiClient, project_id: i64) -> Result<()> {
    account::require_session(client)?;
    let members = client.members(project_id).await?;
    print_members(&members);
    Ok(())
}

pub async fn add(
    client: &ApiClient,
    notifier: &NotificationQueue,
    project_id: i64,
    email: &str,
    role: &str,
) -> Result<()> {
    let role: Role = role.parse().map_err(anyhow::Error::msg)?;
    require_maintainer(client, project_id).await?;

    client
        .add_member(
            project_id,
            &MemberInvite {
                email: email.to_string(),
                role,
            },
        )
        .await?;
    notifier.push("Member saved", NotificationKind::Success);
    reload_members(client, project_id).await
}

pub async fn onboard(
    client: &ApiClient,
    notifier: &NotificationQueue,
    project_id: i64,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> Result<()> {
    let role: Role = role.parse().map_err(anyhow::Error::msg)?;
    account::require_session(client)?;
    // Team management is reachable only with maintainer access somewhere;
    // a failed fetch counts as none.
    let maintained = maintained_or_none(client).await;
    if !has_elevated_access_anywhere(&maintained) {
        bail!("Maintainer access required to onboard users");
    }

    client
        .onboard_member(
            project_id,
            &MemberOnboard {
                name: name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                role,
            },
        )
        .await?;
    notifier.push("New user onboarded and added to team", NotificationKind::Success);
    reload_members(client, project_id).await
}

pub async fn set_role(
    client: &ApiClient,
    notifier: &NotificationQueue,
    project_id: i64,
    user_id: i64,
    role: &str,
) -> Result<()> {
    let role: Role = role.parse().map_err(anyhow::Error::msg)?;
    require_maintainer(client, project_id).await?;

    client.set_member_role(project_id, user_id, role).await?;
    notifier.push("Member role updated", NotificationKind::Success);
    reload_members(client, project_id).await
}

pub async fn remove(
    client: &ApiClient,
    notifier: &NotificationQueue,
    project_id: i64,
    user_id: i64,
) -> Result<()> {
    require_maintainer(client, project_id).await?;

    client.remove_member(project_id, user_id).await?;
    notifier.push("Member removed", NotificationKind::Success);
    reload_members(client, project_id).await
}

/// Gate on the caller's role in this project, read fresh from the server.
async fn require_maintainer(client: &ApiClient, project_id: i64) -> Result<()> {
    let me = account::current_user(client).await?;
    let members = client.members(project_id).await?;
    if !is_maintainer(&members, me.id) {
        bail!("Maintainer role required to manage the team");
    }
    Ok(())
}

async fn reload_members(client: &ApiClient, project_id: i64) -> Result<()> {
    let members = client.members(project_id).await?;
    print_members(&members);
    Ok(())
}

fn print_members(members: &[ProjectMembership]) {
    if members.is_empty() {
        println!("No members.");
        return;
    }
    for member in members {
        println!(
            "#{:<4} {:<24} {:<28} {}",
            member.user_id, member.name, member.email, member.role
        );
    }
}
