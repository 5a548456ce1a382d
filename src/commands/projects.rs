use anyhow::{bail, Result};

use issuehub::api::ApiClient;
use issuehub::auth::{can_create_project, maintained_or_none};
use issuehub::models::{NewProject, Project};
use issuehub::notify::{NotificationKind, NotificationQueue};

use crate::commands::account;

pub async fn list(client: &ApiClient) -> Result<()> {
    account::require_session(client)?;
    let projects = client.projects().await?;
    let maintained = maintained_or_none(client).await;

    print_projects(&projects);
    if !can_create_project(&maintained, &projects) {
        println!("Project creation is restricted to maintainers.");
    }
    Ok(())
}

pub async fn create(
    client: &ApiClient,
    notifier: &NotificationQueue,
    name: &str,
    key: &str,
    description: Option<String>,
) -> Result<()> {
    account::require_session(client)?;
    let projects = client.projects().await?;
    let maintained = maintained_or_none(client).await;
    if !can_create_project(&maintained, &projects) {
        bail!("Only maintainers can create projects");
    }

    let project = client
        .create_project(&NewProject {
            name: name.to_string(),
            key: key.to_string(),
            description,
        })
        .await?;
    notifier.push("Project created", NotificationKind::Success);
    println!("Created project #{} ({})", project.id, project.key);

    let projects = client.projects().await?;
    print_projects(&projects);
    Ok(())
}

fn print_projects(projects: &[Project]) {
    if projects.is_empty() {
        println!("No projects yet.");
        return;
    }
    for project in projects {
        println!("#{:<4} {} ({})", project.id, project.name, project.key);
        if let Some(description) = &project.description {
            if !description.is_empty() {
                println!("      {}", description);
            }
        }
    }
}
