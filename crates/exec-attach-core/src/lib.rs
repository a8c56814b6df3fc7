//! Collaborator interfaces and the scripted command model.
//!
//! This crate provides the pieces the streaming core consumes but does not
//! implement itself:
//! - `ContainerApi` - the remote container-lifecycle interface
//! - `ContainerId` / `ExecId` - opaque remote-issued tokens
//! - `CommandScript` - an ordered, immutable sequence of stdin writes

pub mod api;
pub mod script;

pub use api::{ApiError, ContainerApi, ContainerId, ExecConfig, ExecId};
pub use script::{CommandScript, ScriptedCommand, standard_scenario};
