//! Attribute selection for enrollment certificates.

use tracing::debug;

use crate::traits::AttributeProcessor;
use crate::types::{Attribute, AttributeRequest, Attributes};

/// Object identifier of the attribute certificate extension.
pub const ATTRIBUTE_OID: &str = "1.2.3.4.5.6.7.8.1";

/// Errors raised while resolving attribute requests.
#[derive(Debug, thiserror::Error)]
pub enum AttributeError {
    #[error("required attributes are missing: {names:?}")]
    Missing { names: Vec<String> },
}

/// Requests for every attribute flagged for default inclusion in enrollment
/// certificates. `None` when no attribute is flagged.
#[must_use]
pub fn default_requests(attrs: &[Attribute]) -> Option<Vec<AttributeRequest>> {
    let reqs: Vec<AttributeRequest> = attrs
        .iter()
        .filter(|attr| attr.ecert)
        .map(|attr| AttributeRequest::required(attr.name.clone()))
        .collect();
    if reqs.is_empty() {
        None
    } else {
        Some(reqs)
    }
}

/// Standard [`AttributeProcessor`].
///
/// Every requested attribute the identity has is copied into the result.
/// A missing optional attribute is skipped; any missing required attribute
/// fails the request, naming all of them.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributeManager;

impl AttributeProcessor for AttributeManager {
    fn process(
        &self,
        requests: &[AttributeRequest],
        available: &[Attribute],
    ) -> anyhow::Result<Option<Attributes>> {
        let mut resolved = Attributes::default();
        let mut missing = Vec::new();

        for req in requests {
            match available.iter().find(|attr| attr.name == req.name) {
                Some(attr) => {
                    resolved.attrs.insert(attr.name.clone(), attr.value.clone());
                }
                None if req.optional => {
                    debug!(attribute = %req.name, "optional attribute not found, skipping");
                }
                None => missing.push(req.name.clone()),
            }
        }

        if !missing.is_empty() {
            return Err(AttributeError::Missing { names: missing }.into());
        }
        if resolved.is_empty() {
            return Ok(None);
        }
        Ok(Some(resolved))
    }
}
