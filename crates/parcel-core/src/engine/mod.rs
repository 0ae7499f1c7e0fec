//! # Engine Module
//!
//! The parcel simulation engine: run configuration and its validation, the thermodynamic
//! state of the parcel, pressure-profile policies, the microphysics contract together with
//! its super-droplet implementation, and the spectral diagnostics written to the archive.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`], [`validation`]) - Typed run options, built through
//!   [`config::RunConfigBuilder`] and checked before any resource is created
//! - **State** ([`state`], [`stats`], [`pressure`]) - Parcel thermodynamics and its
//!   evolution during the ascent
//! - **Microphysics** ([`micro`]) - The particle-based engine contract, the adapter used by
//!   the integration loop, and the production super-droplet engine
//! - **Diagnostics** ([`diagnostics`]) - Archive schema and per-record output
//! - **Progress Monitoring** ([`progress`]) - Progress reporting callbacks
//! - **Error Handling** ([`error`]) - Simulation and microphysics error types

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod micro;
pub mod pressure;
pub mod progress;
pub mod state;
pub mod stats;
pub(crate) mod validation;
