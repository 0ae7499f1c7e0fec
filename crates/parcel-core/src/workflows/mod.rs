//! # Workflows Module
//!
//! High-level entry points that run a complete parcel simulation.
//!
//! ## Overview
//!
//! A workflow takes a validated [`crate::engine::config::RunConfig`], creates the
//! microphysics engine, rejects physically invalid starts before any output exists,
//! integrates the ascent (and the optional holding phase) and leaves a finalized
//! archive behind.
//!
//! ## Architecture
//!
//! - **Parcel Workflow** ([`parcel`]) - The integration loop, with
//!   [`parcel::run_to_file`] as the one-call entry point used by the CLI.

pub mod parcel;
