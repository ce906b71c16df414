//! Sparks shipped with the `hearth` binary.
//!
//! They model the components of a desktop VoIP client as plain services so
//! the bootstrap can be exercised end to end:
//!
//! | Spark | Requires |
//! |---|---|
//! | `personal-details` | – |
//! | `call-core` | – |
//! | `presence-core` | `personal-details` |
//! | `status-icon` | `presence-core`, `call-core` |
//!
//! They are queued dependents first, so resolving them takes several sweeps.

use std::rc::Rc;

use hearth_bootstrap::{ServiceSpark, Spark};
use hearth_types::{BasicService, Service};

use crate::config::Config;

pub const PERSONAL_DETAILS: &str = "personal-details";
pub const CALL_CORE: &str = "call-core";
pub const PRESENCE_CORE: &str = "presence-core";
pub const STATUS_ICON: &str = "status-icon";

const DISPLAY_NAME_FLAG: &str = "--display-name";

/// The user's own details, published for other components to read.
#[derive(Debug)]
pub struct PersonalDetails {
    display_name: String,
    description: String,
}

impl PersonalDetails {
    pub fn new(display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        Self {
            description: format!("Personal details of {display_name}"),
            display_name,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

impl Service for PersonalDetails {
    fn name(&self) -> &str {
        PERSONAL_DETAILS
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Remove `--display-name <value>` or `--display-name=<value>` from `args`
/// and return the value.
pub fn take_display_name(args: &mut Vec<String>) -> Option<String> {
    let prefix = format!("{DISPLAY_NAME_FLAG}=");
    let index = args
        .iter()
        .position(|a| a == DISPLAY_NAME_FLAG || a.starts_with(&prefix))?;

    if let Some(value) = args[index].strip_prefix(&prefix) {
        let value = value.to_string();
        args.remove(index);
        return Some(value);
    }
    if index + 1 < args.len() {
        let value = args.remove(index + 1);
        args.remove(index);
        Some(value)
    } else {
        // Dangling flag without a value.
        args.remove(index);
        None
    }
}

fn personal_details(default_name: String) -> ServiceSpark {
    ServiceSpark::new(PERSONAL_DETAILS, move |_, args| {
        let display_name = take_display_name(args).unwrap_or_else(|| default_name.clone());
        Some(Rc::new(PersonalDetails::new(display_name)))
    })
}

fn call_core() -> ServiceSpark {
    ServiceSpark::new(CALL_CORE, |_, _| {
        Some(BasicService::handle(CALL_CORE, "Call management object"))
    })
}

fn presence_core() -> ServiceSpark {
    ServiceSpark::new(PRESENCE_CORE, |core, _| {
        let details = core.get_as::<PersonalDetails>(PERSONAL_DETAILS)?;
        Some(BasicService::handle(
            PRESENCE_CORE,
            format!("Presence of {}", details.display_name()),
        ))
    })
    .requires([PERSONAL_DETAILS])
}

fn status_icon() -> ServiceSpark {
    ServiceSpark::new(STATUS_ICON, |_, _| {
        Some(BasicService::handle(STATUS_ICON, "Status icon"))
    })
    .requires([PRESENCE_CORE, CALL_CORE])
}

/// Every built-in spark not disabled in `cfg`.
pub fn builtin_sparks(cfg: &Config) -> Vec<Box<dyn Spark>> {
    let all: Vec<ServiceSpark> = vec![
        status_icon(),
        presence_core(),
        call_core(),
        personal_details(cfg.display_name.clone()),
    ];
    all.into_iter()
        .filter(|spark| cfg.is_enabled(spark.name()))
        .map(|spark| Box::new(spark) as Box<dyn Spark>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_bootstrap::KickStart;
    use hearth_core::ServiceCore;

    fn kick(cfg: &Config, args: &mut Vec<String>) -> (ServiceCore, hearth_bootstrap::KickReport) {
        let mut kickstart = KickStart::new();
        for spark in builtin_sparks(cfg) {
            kickstart.add_spark(spark);
        }
        let mut core = ServiceCore::new();
        let report = kickstart.kick(&mut core, args);
        (core, report)
    }

    #[test]
    fn builtin_sparks_all_complete() {
        let (core, report) = kick(&Config::default(), &mut Vec::new());
        assert!(report.is_complete());
        assert_eq!(report.fully_initialized.len(), 4);
        assert_eq!(
            core.names().collect::<Vec<_>>(),
            vec![CALL_CORE, PERSONAL_DETAILS, PRESENCE_CORE, STATUS_ICON]
        );
        assert_eq!(
            core.get(PRESENCE_CORE).unwrap().description(),
            "Presence of Anonymous"
        );
    }

    #[test]
    fn display_name_argument_is_consumed() {
        let mut args = vec!["--display-name".to_string(), "Ada".to_string(), "-v".to_string()];
        let (core, _) = kick(&Config::default(), &mut args);
        assert_eq!(args, vec!["-v"]);
        let details = core.get_as::<PersonalDetails>(PERSONAL_DETAILS).unwrap();
        assert_eq!(details.display_name(), "Ada");
        assert_eq!(core.get(PRESENCE_CORE).unwrap().description(), "Presence of Ada");
    }

    #[test]
    fn disabling_a_prerequisite_stalls_its_dependents() {
        let mut cfg = Config::default();
        cfg.disabled_sparks = vec![PERSONAL_DETAILS.to_string()];
        let (core, report) = kick(&cfg, &mut Vec::new());

        assert_eq!(
            report.failed.iter().map(String::as_str).collect::<Vec<_>>(),
            vec![PRESENCE_CORE, STATUS_ICON]
        );
        assert!(core.contains(CALL_CORE));
        assert!(core.get(STATUS_ICON).is_none());
    }

    #[test]
    fn take_display_name_forms() {
        let mut args = vec!["--display-name=Grace".to_string()];
        assert_eq!(take_display_name(&mut args).as_deref(), Some("Grace"));
        assert!(args.is_empty());

        let mut args = vec!["-x".to_string(), "--display-name".to_string()];
        assert_eq!(take_display_name(&mut args), None);
        assert_eq!(args, vec!["-x"]);

        let mut args = vec!["-x".to_string()];
        assert_eq!(take_display_name(&mut args), None);
        assert_eq!(args, vec!["-x"]);
    }
}
