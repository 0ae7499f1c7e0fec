//! # Parcel Core Library
//!
//! A zero-dimensional adiabatic rising-parcel driver used to study cloud droplet
//! activation and aqueous chemistry with a particle-resolved (super-droplet)
//! microphysics engine.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless building blocks: moist thermodynamic
//!   formulas, the lognormal aerosol model, output spectrum definitions, the chemical
//!   species registry and the time-series archive.
//!
//! - **[`engine`]: The Logic Core.** Run configuration and its validation, the parcel
//!   state vector, hydrostatic pressure policies, the microphysics coupling contract
//!   (with a built-in serial super-droplet engine) and spectral diagnostics.
//!
//! - **[`workflows`]: The Public API.** The integration loop that ties everything
//!   together, from initial validation to the finalized archive.

pub mod core;
pub mod engine;
pub mod workflows;
