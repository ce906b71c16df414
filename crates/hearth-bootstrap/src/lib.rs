//! `hearth-bootstrap` – populating a registry at startup.
//!
//! Independent modules contribute [`Spark`]s; [`KickStart`] runs them against
//! one [`ServiceCore`][hearth_core::ServiceCore] until every spark has
//! published its services or no further progress is possible.
//!
//! # Modules
//!
//! - [`spark`] – the [`Spark`][spark::Spark] trait and
//!   [`ServiceSpark`][spark::ServiceSpark], a spark that registers one
//!   service once its prerequisites exist.
//! - [`kickstart`] – [`KickStart`][kickstart::KickStart], the fixed-point
//!   sweep driver, and its [`KickReport`][kickstart::KickReport].

pub mod kickstart;
pub mod spark;

pub use kickstart::{KickReport, KickStart};
pub use spark::{ServiceFactory, ServiceSpark, Spark};
