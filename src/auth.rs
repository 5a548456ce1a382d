use tracing::warn;

use crate::api::ApiClient;
use crate::models::{Project, ProjectMembership, Role};

/// Role the user holds in the project whose membership list this is.
/// `None` means view-only: the user may see the project but mutates nothing.
pub fn role_for(members: &[ProjectMembership], user_id: i64) -> Option<Role> {
    members
        .iter()
        .find(|member| member.user_id == user_id)
        .map(|member| member.role)
}

pub fn is_maintainer(members: &[ProjectMembership], user_id: i64) -> bool {
    matches!(role_for(members, user_id), Some(Role::Maintainer))
}

/// True when the user maintains at least one project. Gates team
/// management; recomputed from a fresh list on every use.
pub fn has_elevated_access_anywhere(maintained: &[Project]) -> bool {
    !maintained.is_empty()
}

/// A user with no projects at all may create the first one; everyone else
/// needs a maintainer role somewhere.
pub fn can_create_project(maintained: &[Project], joined: &[Project]) -> bool {
    has_elevated_access_anywhere(maintained) || joined.is_empty()
}

/// Fetches the maintained-projects list, failing closed: any error counts
/// as "maintains nothing" rather than granting elevated access.
pub async fn maintained_or_none(client: &ApiClient) -> Vec<Project> {
    match client.maintained_projects().await {
        Ok(projects) => projects,
        Err(err) => {
            warn!(error = %err, "maintained projects fetch failed; assuming none");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiClient, ApiError};
    use crate::session::SessionStore;
    use crate::test_support::StubTransport;
    use chrono::NaiveDateTime;
    use proptest::prelude::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn member(user_id: i64, role: Role) -> ProjectMembership {
        ProjectMembership {
            user_id,
            name: format!("User {user_id}"),
            email: format!("user{user_id}@example.com"),
            role,
        }
    }

    fn project(id: i64) -> Project {
        Project {
            id,
            name: format!("Project {id}"),
            key: format!("P{id}"),
            description: None,
            created_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn test_role_for_returns_stored_role() {
        let members = vec![member(1, Role::Member), member(2, Role::Maintainer)];
        assert_eq!(role_for(&members, 1), Some(Role::Member));
        assert_eq!(role_for(&members, 2), Some(Role::Maintainer));
    }

    #[test]
    fn test_role_for_none_without_membership() {
        let members = vec![member(1, Role::Member)];
        assert_eq!(role_for(&members, 99), None);
        assert!(!is_maintainer(&members, 99));
    }

    #[test]
    fn test_role_for_empty_list() {
        assert_eq!(role_for(&[], 1), None);
    }

    #[test]
    fn test_member_is_not_maintainer() {
        let members = vec![member(5, Role::Member)];
        assert!(!is_maintainer(&members, 5));
    }

    #[test]
    fn test_elevated_access_requires_nonempty_list() {
        assert!(!has_elevated_access_anywhere(&[]));
        assert!(has_elevated_access_anywhere(&[project(1)]));
    }

    #[test]
    fn test_zero_project_user_may_bootstrap_first_project() {
        assert!(can_create_project(&[], &[]));
    }

    #[test]
    fn test_plain_member_cannot_create_project() {
        assert!(!can_create_project(&[], &[project(1)]));
    }

    #[test]
    fn test_maintainer_anywhere_can_create_project() {
        assert!(can_create_project(&[project(2)], &[project(1), project(2)]));
    }

    #[tokio::test]
    async fn test_maintained_fetch_failure_fails_closed() {
        let dir = tempdir().unwrap();
        let session = SessionStore::open(&dir.path().join("session.db")).unwrap();
        let transport = Arc::new(StubTransport::new());
        transport.push_error(ApiError::Network("connection refused".to_string()));
        let client = ApiClient::with_transport(transport, session);

        let maintained = maintained_or_none(&client).await;
        assert!(maintained.is_empty());
        assert!(!has_elevated_access_anywhere(&maintained));
    }

    proptest! {
        #[test]
        fn prop_role_for_is_idempotent(
            user_ids in proptest::collection::vec(1i64..50, 0..8),
            probe in 1i64..50
        ) {
            let members: Vec<ProjectMembership> = user_ids
                .iter()
                .map(|&id| member(id, if id % 2 == 0 { Role::Member } else { Role::Maintainer }))
                .collect();

            let first = role_for(&members, probe);
            let second = role_for(&members, probe);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_role_for_matches_first_entry(user_id in 1i64..50) {
            let members = vec![member(user_id, Role::Maintainer)];
            prop_assert_eq!(role_for(&members, user_id), Some(Role::Maintainer));
        }

        #[test]
        fn prop_absent_user_has_no_role(
            user_ids in proptest::collection::vec(1i64..50, 0..8),
            probe in 100i64..200
        ) {
            let members: Vec<ProjectMembership> = user_ids
                .iter()
                .map(|&id| member(id, Role::Member))
                .collect();
            prop_assert_eq!(role_for(&members, probe), None);
        }
    }
}
