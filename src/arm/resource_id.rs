//! ARM resource identifiers
//!
//! Parses and renders the `/subscriptions/{id}/resourceGroups/{rg}/providers/
//! {namespace}/{type}/{name}/...` identifiers the management API assigns.
//! Read and delete recover the resource's identity from its stored
//! identifier, so parsing has to be exact.

use anyhow::Result;
use std::fmt;

/// A parsed ARM resource identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    /// Provider namespace, e.g. `Microsoft.ApiManagement`.
    pub provider: String,
    /// Ordered (type, name) segments under the provider, outermost first.
    pub path: Vec<(String, String)>,
}

impl ResourceId {
    /// Parse an identifier as returned by the management API.
    pub fn parse(id: &str) -> Result<Self> {
        let mut segments = id.trim_matches('/').split('/');

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider = None;
        let mut path = Vec::new();

        while let Some(key) = segments.next() {
            let value = segments
                .next()
                .ok_or_else(|| anyhow::anyhow!("resource ID {:?} has a dangling segment {:?}", id, key))?;

            if value.is_empty() {
                return Err(anyhow::anyhow!(
                    "resource ID {:?} has an empty value for segment {:?}",
                    id,
                    key
                ));
            }

            match key.to_ascii_lowercase().as_str() {
                "subscriptions" => subscription_id = Some(value.to_string()),
                "resourcegroups" => resource_group = Some(value.to_string()),
                "providers" => provider = Some(value.to_string()),
                _ if provider.is_some() => path.push((key.to_string(), value.to_string())),
                _ => {
                    return Err(anyhow::anyhow!(
                        "unexpected segment {:?} in resource ID {:?}",
                        key,
                        id
                    ))
                }
            }
        }

        let subscription_id = subscription_id
            .ok_or_else(|| anyhow::anyhow!("resource ID {:?} has no subscription", id))?;
        let resource_group = resource_group
            .ok_or_else(|| anyhow::anyhow!("resource ID {:?} has no resource group", id))?;
        let provider =
            provider.ok_or_else(|| anyhow::anyhow!("resource ID {:?} has no provider", id))?;

        if path.is_empty() {
            return Err(anyhow::anyhow!(
                "resource ID {:?} names no resource under provider {:?}",
                id,
                provider
            ));
        }

        Ok(Self {
            subscription_id,
            resource_group,
            provider,
            path,
        })
    }

    /// Name of the path segment with the given type, e.g. `"service"` or
    /// `"workflows"`.
    pub fn name_of(&self, segment_type: &str) -> Option<&str> {
        self.path
            .iter()
            .find(|(ty, _)| ty == segment_type)
            .map(|(_, name)| name.as_str())
    }

    /// Like [`Self::name_of`] but errors with the full identifier when the
    /// segment is absent.
    pub fn require(&self, segment_type: &str) -> Result<String> {
        self.name_of(segment_type)
            .map(|s| s.to_string())
            .ok_or_else(|| {
                anyhow::anyhow!("resource ID {} has no {:?} segment", self, segment_type)
            })
    }

    /// The innermost resource name.
    pub fn leaf_name(&self) -> &str {
        // path is never empty after parse
        &self.path[self.path.len() - 1].1
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}",
            self.subscription_id, self.resource_group, self.provider
        )?;
        for (ty, name) in &self.path {
            write!(f, "/{}/{}", ty, name)?;
        }
        Ok(())
    }
}
