//! Generic Mutation Dispatcher
//!
//! Resource-type clients differ only in their mutation call's name and
//! parameter type; everything else about "write then confirm" is identical.
//! This module captures that once: invoke the client's mutation, read the
//! resource back through the canonical fetch, and record the remote
//! identifier into the caller's state.
//!
//! The dispatcher is a single stateless call with two strictly sequential
//! remote operations and no retry of its own. Cancellation is the caller's:
//! dropping the returned future abandons whichever remote call is in flight.

use crate::state::ResourceState;
use async_trait::async_trait;

/// A remote value that carries the permanent identifier assigned by the
/// management API.
pub trait RemoteResource {
    /// The remote identifier, when the service returned one.
    fn id(&self) -> Option<&str>;
}

/// The narrow capability a resource-type client must expose to be driven by
/// [`write_then_confirm`]: one parameterized mutation and one canonical fetch
/// keyed by (resource group, name).
///
/// Adapters for nested resource types bind any extra path segments (parent
/// service, parent API, ...) at construction time so the two operations keep
/// this fixed shape.
#[async_trait]
pub trait ResourceClient {
    /// Request payload for the mutation, forwarded verbatim.
    type Params: Send + Sync;
    /// Value returned by the canonical fetch.
    type Resource: RemoteResource + Send;

    /// Display name of the mutation, used in error text and logs.
    fn operation(&self) -> &str {
        "CreateOrUpdate"
    }

    /// The create-or-update call against the remote API.
    async fn mutate(&self, group: &str, name: &str, params: &Self::Params)
        -> anyhow::Result<()>;

    /// The canonical read-back call used to confirm a mutation.
    async fn fetch(&self, group: &str, name: &str) -> anyhow::Result<Self::Resource>;
}

/// How a dispatch failed. Each variant maps to one stage so callers can tell
/// a transport failure apart from an inconsistent remote response.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The state was handed over without a usable identity field.
    #[error("resource state is missing required identity field `{field}`")]
    MissingIdentity { field: &'static str },

    /// The mutation call itself failed; nothing was written to the state.
    #[error("`{operation}` of {name:?} (resource group {group:?}) failed: {cause:#}")]
    Mutation {
        operation: String,
        name: String,
        group: String,
        cause: anyhow::Error,
    },

    /// The mutation returned success but the confirming fetch failed. The
    /// remote object may exist; the local identifier is left unset so a later
    /// read reconciliation can pick it up.
    #[error("reading back {name:?} (resource group {group:?}) after `{operation}`: {cause:#}")]
    Confirm {
        operation: String,
        name: String,
        group: String,
        cause: anyhow::Error,
    },

    /// Both calls succeeded but the fetched resource carried no identifier.
    /// Treated as fatal on first occurrence rather than retried.
    #[error("cannot read ID of {name:?} (resource group {group:?})")]
    MissingId { name: String, group: String },
}

/// Perform the write-then-confirm sequence for one resource.
///
/// Reads `name` and `resource_group_name` out of `state`, invokes the
/// client's mutation with `params`, confirms with the canonical fetch, and on
/// full success writes the fetched identifier into `state`. Exactly one
/// mutation and at most one fetch are issued; the identifier field is
/// modified if and only if both calls succeeded with a non-empty identifier.
pub async fn write_then_confirm<C: ResourceClient>(
    state: &mut ResourceState,
    client: &C,
    params: &C::Params,
) -> Result<(), DispatchError> {
    let name = non_empty(state, "name")?;
    let group = non_empty(state, "resource_group_name")?;
    let operation = client.operation().to_string();

    tracing::debug!(%operation, %name, %group, "dispatching mutation");

    client
        .mutate(&group, &name, params)
        .await
        .map_err(|cause| DispatchError::Mutation {
            operation: operation.clone(),
            name: name.clone(),
            group: group.clone(),
            cause,
        })?;

    let read = client
        .fetch(&group, &name)
        .await
        .map_err(|cause| DispatchError::Confirm {
            operation: operation.clone(),
            name: name.clone(),
            group: group.clone(),
            cause,
        })?;

    match read.id() {
        Some(id) if !id.is_empty() => {
            tracing::debug!(%name, %group, %id, "mutation confirmed");
            state.set_id(id);
            Ok(())
        }
        _ => Err(DispatchError::MissingId { name, group }),
    }
}

fn non_empty(state: &ResourceState, field: &'static str) -> Result<String, DispatchError> {
    match state.get_string(field) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(DispatchError::MissingIdentity { field }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubResource {
        id: Option<String>,
    }

    impl RemoteResource for StubResource {
        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }
    }

    /// Programmable client recording how often each operation ran.
    struct StubClient {
        mutate_error: Option<String>,
        fetch_error: Option<String>,
        fetched_id: Option<String>,
        mutations: AtomicUsize,
        fetches: AtomicUsize,
    }

    impl StubClient {
        fn returning_id(id: &str) -> Self {
            Self {
                mutate_error: None,
                fetch_error: None,
                fetched_id: Some(id.to_string()),
                mutations: AtomicUsize::new(0),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ResourceClient for StubClient {
        type Params = serde_json::Value;
        type Resource = StubResource;

        async fn mutate(
            &self,
            _group: &str,
            _name: &str,
            _params: &Self::Params,
        ) -> anyhow::Result<()> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            match &self.mutate_error {
                Some(msg) => Err(anyhow::anyhow!("{}", msg)),
                None => Ok(()),
            }
        }

        async fn fetch(&self, _group: &str, _name: &str) -> anyhow::Result<Self::Resource> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            match &self.fetch_error {
                Some(msg) => Err(anyhow::anyhow!("{}", msg)),
                None => Ok(StubResource {
                    id: self.fetched_id.clone(),
                }),
            }
        }
    }

    fn state() -> ResourceState {
        ResourceState::from_fields([("name", json!("svc1")), ("resource_group_name", json!("rg1"))])
    }

    #[tokio::test]
    async fn test_success_records_fetched_id() {
        let mut state = state();
        let client = StubClient::returning_id("/subscriptions/x/providers/p/svc1");

        write_then_confirm(&mut state, &client, &json!({})).await.unwrap();

        assert_eq!(state.id(), Some("/subscriptions/x/providers/p/svc1"));
        assert_eq!(client.mutations.load(Ordering::SeqCst), 1);
        assert_eq!(client.fetches.load(Ordering::SeqCst), 1);
        // identity fields untouched
        assert_eq!(state.get_string("name"), Some("svc1"));
        assert_eq!(state.get_string("resource_group_name"), Some("rg1"));
        assert_eq!(state.len(), 2);
    }

    #[tokio::test]
    async fn test_mutation_failure_skips_fetch() {
        let mut state = state();
        let client = StubClient {
            mutate_error: Some("quota exceeded".to_string()),
            ..StubClient::returning_id("ignored")
        };

        let err = write_then_confirm(&mut state, &client, &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Mutation { .. }));
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(state.id(), None);
        assert_eq!(client.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_id_unset() {
        let mut state = state();
        let client = StubClient {
            fetch_error: Some("connection reset".to_string()),
            ..StubClient::returning_id("ignored")
        };

        let err = write_then_confirm(&mut state, &client, &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Confirm { .. }));
        assert_eq!(state.id(), None);
        assert_eq!(client.mutations.load(Ordering::SeqCst), 1);
        assert_eq!(client.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_id_is_a_distinct_error_naming_the_resource() {
        let mut state = state();
        let client = StubClient {
            fetched_id: None,
            ..StubClient::returning_id("")
        };

        let err = write_then_confirm(&mut state, &client, &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::MissingId { .. }));
        let msg = err.to_string();
        assert!(msg.contains("svc1"));
        assert!(msg.contains("rg1"));
        assert_eq!(state.id(), None);
    }

    #[tokio::test]
    async fn test_empty_string_id_is_rejected() {
        let mut state = state();
        let client = StubClient::returning_id("");

        let err = write_then_confirm(&mut state, &client, &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::MissingId { .. }));
        assert_eq!(state.id(), None);
    }

    #[tokio::test]
    async fn test_missing_identity_fields_fail_before_any_call() {
        let mut state = ResourceState::from_fields([("name", json!("svc1"))]);
        let client = StubClient::returning_id("id");

        let err = write_then_confirm(&mut state, &client, &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::MissingIdentity {
                field: "resource_group_name"
            }
        ));
        assert_eq!(client.mutations.load(Ordering::SeqCst), 0);
        assert_eq!(client.fetches.load(Ordering::SeqCst), 0);
    }
}
