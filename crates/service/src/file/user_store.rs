use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::storage::json_snapshot_store::{JsonSnapshotStore, Snapshot};

/// A stored user record. Exactly these two fields are ever persisted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub email: String,
}

/// Create/update input. Both fields are required on create; on update each
/// field overwrites the stored value only when present. Unknown input fields
/// are dropped during deserialization and never reach the store.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// File-backed user store.
///
/// Every operation loads the full snapshot from disk, works on it, and (for
/// mutations) writes the full snapshot back. Ids are assigned as
/// `max(existing) + 1`, so deleting the highest id frees that number for the
/// next create.
pub struct UserStore {
    store: JsonSnapshotStore<User>,
}

fn next_id(snapshot: &Snapshot<User>) -> u64 {
    snapshot.keys().next_back().copied().unwrap_or(0) + 1
}

impl UserStore {
    /// Open the store over the given file path. A missing file reads as an
    /// empty store.
    pub fn new<P: Into<std::path::PathBuf>>(path: P) -> Arc<Self> {
        Arc::new(Self { store: JsonSnapshotStore::new(path) })
    }

    /// List all users.
    pub async fn list(&self) -> Snapshot<User> {
        self.store.load().await
    }

    /// Get a user by id.
    pub async fn get(&self, id: u64) -> Result<User, ServiceError> {
        self.store
            .load()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("user"))
    }

    /// Create a new user; both `name` and `email` must be present.
    pub async fn create(&self, input: UserInput) -> Result<(u64, User), ServiceError> {
        let (Some(name), Some(email)) = (input.name, input.email) else {
            return Err(ServiceError::Validation("name and email are required".into()));
        };
        let mut snapshot = self.store.load().await;
        let id = next_id(&snapshot);
        let user = User { name, email };
        snapshot.insert(id, user.clone());
        self.store.save(&snapshot).await?;
        Ok((id, user))
    }

    /// Merge the present fields into an existing user. An empty input is a
    /// legal no-op that still rewrites the file.
    pub async fn update(&self, id: u64, input: UserInput) -> Result<User, ServiceError> {
        let mut snapshot = self.store.load().await;
        let user = snapshot.get_mut(&id).ok_or_else(|| ServiceError::not_found("user"))?;
        if let Some(name) = input.name {
            user.name = name;
        }
        if let Some(email) = input.email {
            user.email = email;
        }
        let updated = user.clone();
        self.store.save(&snapshot).await?;
        Ok(updated)
    }

    /// Remove a user and return the removed record.
    pub async fn delete(&self, id: u64) -> Result<User, ServiceError> {
        let mut snapshot = self.store.load().await;
        let removed = snapshot.remove(&id).ok_or_else(|| ServiceError::not_found("user"))?;
        self.store.save(&snapshot).await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn tmp_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("user_store_{}.json", Uuid::new_v4()))
    }

    fn input(name: &str, email: &str) -> UserInput {
        UserInput { name: Some(name.into()), email: Some(email.into()) }
    }

    #[tokio::test]
    async fn crud_flow_with_id_reuse() -> Result<(), anyhow::Error> {
        let path = tmp_path();
        let store = UserStore::new(&path);

        // empty store allocates 1, then 2
        let (id1, ann) = store.create(input("Ann", "a@x.com")).await?;
        assert_eq!(id1, 1);
        assert_eq!(ann, User { name: "Ann".into(), email: "a@x.com".into() });
        let (id2, _) = store.create(input("Bo", "b@x.com")).await?;
        assert_eq!(id2, 2);

        // partial update touches only the given field
        let updated = store
            .update(1, UserInput { name: None, email: Some("ann@y.com".into()) })
            .await?;
        assert_eq!(updated, User { name: "Ann".into(), email: "ann@y.com".into() });

        // delete returns the removed record and frees the id
        let removed = store.delete(2).await?;
        assert_eq!(removed.name, "Bo");
        assert!(matches!(store.get(2).await, Err(ServiceError::NotFound(_))));

        // max id was deleted, so 2 is handed out again
        let (id3, _) = store.create(input("Cid", "c@x.com")).await?;
        assert_eq!(id3, 2);

        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn new_id_exceeds_every_existing_id() -> Result<(), anyhow::Error> {
        let path = tmp_path();
        let store = UserStore::new(&path);

        for i in 1..=5u64 {
            let (id, _) = store.create(input(&format!("u{}", i), "u@x.com")).await?;
            assert_eq!(id, i);
        }
        // deleting a non-maximal id never frees its number
        store.delete(3).await?;
        let (id, _) = store.create(input("u6", "u@x.com")).await?;
        assert_eq!(id, 6);

        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn create_requires_both_fields_and_leaves_store_unchanged() -> Result<(), anyhow::Error> {
        let path = tmp_path();
        let store = UserStore::new(&path);

        let missing_email = UserInput { name: Some("X".into()), email: None };
        assert!(matches!(store.create(missing_email).await, Err(ServiceError::Validation(_))));
        let missing_name = UserInput { name: None, email: Some("x@x.com".into()) };
        assert!(matches!(store.create(missing_name).await, Err(ServiceError::Validation(_))));
        assert!(store.list().await.is_empty());
        // nothing was persisted either
        assert!(tokio::fs::metadata(&path).await.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn update_with_only_name_keeps_email() -> Result<(), anyhow::Error> {
        let path = tmp_path();
        let store = UserStore::new(&path);

        let (id, _) = store.create(input("Ann", "a@x.com")).await?;
        let updated = store
            .update(id, UserInput { name: Some("Anna".into()), email: None })
            .await?;
        assert_eq!(updated, User { name: "Anna".into(), email: "a@x.com".into() });

        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn unknown_input_fields_are_dropped() -> Result<(), anyhow::Error> {
        let path = tmp_path();
        let store = UserStore::new(&path);

        let parsed: UserInput = serde_json::from_value(serde_json::json!({
            "name": "Ann",
            "email": "a@x.com",
            "role": "admin",
        }))?;
        let (id, _) = store.create(parsed).await?;

        // the stored object holds exactly name and email
        let raw: serde_json::Value = serde_json::from_slice(&tokio::fs::read(&path).await?)?;
        let stored = raw.get(id.to_string()).expect("record persisted");
        let fields: Vec<&String> = stored.as_object().expect("object").keys().collect();
        assert_eq!(fields.len(), 2);
        assert!(stored.get("role").is_none());

        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn empty_update_is_a_no_op_write() -> Result<(), anyhow::Error> {
        let path = tmp_path();
        let store = UserStore::new(&path);

        let (id, created) = store.create(input("Ann", "a@x.com")).await?;
        let before = tokio::fs::read(&path).await?;
        let updated = store.update(id, UserInput::default()).await?;
        assert_eq!(updated, created);
        assert_eq!(tokio::fs::read(&path).await?, before);

        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn missing_id_is_not_found_for_every_operation() -> Result<(), anyhow::Error> {
        let path = tmp_path();
        let store = UserStore::new(&path);

        assert!(matches!(store.get(7).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(
            store.update(7, input("X", "x@x.com")).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(store.delete(7).await, Err(ServiceError::NotFound(_))));

        Ok(())
    }

    #[tokio::test]
    async fn reopen_sees_persisted_records() -> Result<(), anyhow::Error> {
        let path = tmp_path();
        let store = UserStore::new(&path);
        let (id, user) = store.create(input("Ann", "a@x.com")).await?;

        let reopened = UserStore::new(&path);
        assert_eq!(reopened.get(id).await?, user);

        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }
}
