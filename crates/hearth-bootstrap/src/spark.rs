//! [`Spark`] – a unit of startup logic that populates a [`ServiceCore`].
//!
//! A spark is asked, possibly several times, to make progress.  Each call
//! it inspects the registry, registers whatever it can, and reports how far
//! it has come as a [`SparkState`].  A spark typically waits (stays
//! [`SparkState::Blank`]) until the services it depends on exist.
//!
//! [`ServiceSpark`] covers the common case of "register one service once
//! these other services are present".

use hearth_core::ServiceCore;
use hearth_types::{ServiceHandle, SparkState};
use tracing::{debug, warn};

/// An initializer driven by [`KickStart`][crate::KickStart].
///
/// Implement this trait for startup code with dependencies on other
/// services.  `try_initialize_more` is never called again once it has
/// returned [`SparkState::Full`].
pub trait Spark {
    /// Name used in diagnostics and in the [`KickReport`][crate::KickReport].
    fn name(&self) -> &str;

    /// Try to register more services into `core`.
    ///
    /// `args` is the process argument vector; a spark may remove the
    /// options it consumes.  Returns the spark's state after the attempt.
    fn try_initialize_more(&mut self, core: &mut ServiceCore, args: &mut Vec<String>) -> SparkState;
}

/// Factory closure used by [`ServiceSpark`] to build its service.
///
/// Returning `None` means "not now"; the spark stays blank and is retried on
/// the next sweep.
pub type ServiceFactory = dyn FnMut(&ServiceCore, &mut Vec<String>) -> Option<ServiceHandle>;

/// Spark that registers a single service named after itself once all of its
/// prerequisites are registered.
///
/// If a service with the spark's name is already present the spark declines
/// to build another one and reports [`SparkState::Full`].
///
/// # Example
///
/// ```
/// use hearth_bootstrap::{ServiceSpark, Spark};
/// use hearth_core::ServiceCore;
/// use hearth_types::{BasicService, SparkState};
///
/// let mut core = ServiceCore::new();
/// let mut presence = ServiceSpark::new("presence-core", |_, _| {
///     Some(BasicService::handle("presence-core", "Presence management"))
/// })
/// .requires(["personal-details"]);
///
/// let mut args = Vec::new();
/// assert_eq!(presence.try_initialize_more(&mut core, &mut args), SparkState::Blank);
///
/// core.add(BasicService::handle("personal-details", "Personal details"));
/// assert_eq!(presence.try_initialize_more(&mut core, &mut args), SparkState::Full);
/// assert!(core.get("presence-core").is_some());
/// ```
pub struct ServiceSpark {
    name: String,
    requires: Vec<String>,
    factory: Box<ServiceFactory>,
    state: SparkState,
}

impl ServiceSpark {
    /// Build a spark named `name` whose service is produced by `factory`.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: FnMut(&ServiceCore, &mut Vec<String>) -> Option<ServiceHandle> + 'static,
    {
        Self {
            name: name.into(),
            requires: Vec::new(),
            factory: Box::new(factory),
            state: SparkState::Blank,
        }
    }

    /// Add prerequisite service names.
    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(names.into_iter().map(Into::into));
        self
    }

    /// Prerequisites not yet registered in `core`.
    pub fn missing_prerequisites<'a>(&'a self, core: &ServiceCore) -> Vec<&'a str> {
        self.requires
            .iter()
            .map(String::as_str)
            .filter(|name| !core.contains(name))
            .collect()
    }

    pub fn state(&self) -> SparkState {
        self.state
    }
}

impl Spark for ServiceSpark {
    fn name(&self) -> &str {
        &self.name
    }

    fn try_initialize_more(&mut self, core: &mut ServiceCore, args: &mut Vec<String>) -> SparkState {
        if self.state == SparkState::Full {
            return self.state;
        }

        if core.contains(&self.name) {
            debug!(spark = %self.name, "service already registered; nothing to do");
            self.state = SparkState::Full;
            return self.state;
        }

        let missing = self.missing_prerequisites(core);
        if !missing.is_empty() {
            debug!(spark = %self.name, missing = ?missing, "waiting for prerequisites");
            return self.state;
        }

        let Some(service) = (self.factory)(core, args) else {
            debug!(spark = %self.name, "factory declined to build its service");
            return self.state;
        };

        if service.name() != self.name {
            warn!(
                spark = %self.name,
                service = %service.name(),
                "spark registered a service under a different name"
            );
        }
        if !core.add(service) {
            debug!(spark = %self.name, "service name taken by another spark; nothing registered");
            return self.state;
        }
        self.state = SparkState::Full;
        self.state
    }
}

impl std::fmt::Debug for ServiceSpark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceSpark")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
