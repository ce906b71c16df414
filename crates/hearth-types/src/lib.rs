//! `hearth-types` – shared vocabulary for the hearth service registry.
//!
//! Every crate in the workspace speaks in terms of the types defined here:
//!
//! - [`Service`] – the two-method contract any component implements to be
//!   published in a registry.
//! - [`ServiceHandle`] – the reference-counted handle the registry and its
//!   consumers share.
//! - [`SparkState`] – how far an initializer has progressed.
//! - [`HearthError`] – the error taxonomy used by the `Result`-returning
//!   convenience APIs.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upcast helper that lets a `Rc<dyn Service>` be turned back into its
/// concrete type.
///
/// Blanket-implemented for every `'static` type; never implement it by hand.
pub trait AsAny: Any {
    /// Convert a shared handle into a `Rc<dyn Any>` for downcasting.
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// A named, describable unit of functionality.
///
/// The name is the service's identity inside a registry and must not change
/// for the lifetime of the value.
///
/// # Example
///
/// ```
/// use hearth_types::Service;
///
/// struct CallCore;
///
/// impl Service for CallCore {
///     fn name(&self) -> &str {
///         "call-core"
///     }
///
///     fn description(&self) -> &str {
///         "Call management object"
///     }
/// }
///
/// assert_eq!(CallCore.name(), "call-core");
/// ```
pub trait Service: AsAny {
    /// Unique name within a registry (e.g. `"presence-core"`).
    fn name(&self) -> &str;

    /// Free-text, human-readable description.
    fn description(&self) -> &str;
}

/// Shared handle to a registered service.
pub type ServiceHandle = Rc<dyn Service>;

/// Downcast a [`ServiceHandle`] to its concrete type.
///
/// Returns `None` when the handle holds some other type.
pub fn downcast_service<T: Service>(handle: ServiceHandle) -> Option<Rc<T>> {
    handle.into_any_rc().downcast::<T>().ok()
}

/// A plain service carrying only a name and a description.
///
/// Useful for markers ("this feature is available") and in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicService {
    name: String,
    description: String,
}

impl BasicService {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Build the service and wrap it in a [`ServiceHandle`].
    pub fn handle(name: impl Into<String>, description: impl Into<String>) -> ServiceHandle {
        Rc::new(Self::new(name, description))
    }
}

impl Service for BasicService {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Completion state of an initializer ("spark").
///
/// States are ordered: `Blank < Partial < Full`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SparkState {
    /// Nothing registered yet.
    #[default]
    Blank,
    /// Some, but not all, of the spark's services are registered.
    Partial,
    /// Everything the spark is responsible for is registered.
    Full,
}

impl fmt::Display for SparkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SparkState::Blank => write!(f, "blank"),
            SparkState::Partial => write!(f, "partial"),
            SparkState::Full => write!(f, "full"),
        }
    }
}

/// Error taxonomy of the registry and bootstrap layers.
///
/// None of these is fatal: the registry itself reports duplicates and
/// misses through `bool` / `Option`, and these variants exist for callers
/// that would rather propagate with `?`.
#[derive(Error, Debug)]
pub enum HearthError {
    #[error("Duplicate service name: {0}")]
    DuplicateName(String),

    #[error("Service not found: {0}")]
    NotFound(String),

    #[error("Service {0} is registered with a different concrete type")]
    TypeMismatch(String),

    #[error("Initializers stalled before completion: {}", .0.join(", "))]
    InitializerStalled(Vec<String>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Other;

    impl Service for Other {
        fn name(&self) -> &str {
            "other"
        }

        fn description(&self) -> &str {
            "another concrete type"
        }
    }

    #[test]
    fn downcast_to_concrete_type() {
        let handle = BasicService::handle("call-core", "Call management object");
        let concrete = downcast_service::<BasicService>(handle).expect("same type");
        assert_eq!(concrete.description(), "Call management object");
    }

    #[test]
    fn downcast_to_wrong_type_is_none() {
        let handle: ServiceHandle = Rc::new(Other);
        assert!(downcast_service::<BasicService>(handle).is_none());
    }

    #[test]
    fn spark_states_are_ordered() {
        assert!(SparkState::Blank < SparkState::Partial);
        assert!(SparkState::Partial < SparkState::Full);
        assert_eq!(SparkState::default(), SparkState::Blank);
    }

    #[test]
    fn spark_state_serializes_lowercase() {
        let json = serde_json::to_string(&SparkState::Partial).unwrap();
        assert_eq!(json, "\"partial\"");
        let back: SparkState = serde_json::from_str("\"full\"").unwrap();
        assert_eq!(back, SparkState::Full);
        assert_eq!(SparkState::Blank.to_string(), "blank");
    }

    #[test]
    fn stalled_error_lists_spark_names() {
        let err = HearthError::InitializerStalled(vec!["status-icon".into(), "presence".into()]);
        assert_eq!(
            err.to_string(),
            "Initializers stalled before completion: status-icon, presence"
        );

        let err = HearthError::DuplicateName("kde-core".into());
        assert!(err.to_string().contains("kde-core"));
    }

    #[test]
    fn serialization_error_is_not_a_config_error() {
        let err = HearthError::Serialization("failed to encode report: eof".into());
        assert_eq!(err.to_string(), "Serialization error: failed to encode report: eof");
        assert!(!matches!(err, HearthError::Config(_)));
        assert_eq!(SparkState::default(), SparkState::Blank);
    }
}
