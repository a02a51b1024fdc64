use std::collections::BTreeMap;

use anyhow::{Result, bail};

use crate::{
    config::{MissingConfigurationError, Settings},
    descriptor::ResourceDescriptor,
};

/// Options passed through to the scope untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StackProps {
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
}

/// A stack as it was registered with a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEntry {
    pub id: String,
    pub props: StackProps,
    pub descriptor: ResourceDescriptor,
}

/// Something stacks can register themselves with.
///
/// What happens to a registered stack is up to the implementation.
pub trait Scope {
    fn register(&mut self, entry: StackEntry);
}

/// Longest stack name the provisioning engine accepts.
const MAX_STACK_ID_LEN: usize = 128;

/// Check that `id` is a valid stack name.
///
/// It must start with an ASCII letter and contain only ASCII letters, digits and hyphens. Ids are
/// used as file names in the cloud assembly, so this also keeps them inside it.
pub fn check_stack_id(id: &str) -> Result<()> {
    let Some(first) = id.chars().next() else {
        bail!("Stack id must not be empty")
    };
    if !first.is_ascii_alphabetic() {
        bail!("Stack id {id} must start with a letter");
    }
    if let Some(invalid) = id.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '-') {
        bail!("Stack id {id} contains invalid character {invalid:?}");
    }
    if id.len() > MAX_STACK_ID_LEN {
        bail!("Stack id {id} is longer than {MAX_STACK_ID_LEN} characters");
    }
    Ok(())
}

pub struct MomentoLambdaStack;

impl MomentoLambdaStack {
    /// Validate the settings and register the function with the scope.
    ///
    /// The API key is checked before the endpoint, so when both are missing the error names the
    /// API key. Nothing is registered on failure.
    pub fn build(
        scope: &mut impl Scope,
        id: &str,
        props: Option<StackProps>,
        settings: &Settings,
    ) -> Result<ResourceDescriptor, MissingConfigurationError> {
        let api_key = settings.require_api_key()?;
        let endpoint = settings.require_endpoint()?;

        let descriptor = ResourceDescriptor::new(api_key, endpoint);

        scope.register(StackEntry {
            id: id.into(),
            props: props.unwrap_or_default(),
            descriptor: descriptor.clone(),
        });

        Ok(descriptor)
    }
}
