//! # Core Module
//!
//! Stateless building blocks shared by the engine and the workflows.
//!
//! - **Thermodynamics** ([`thermo`]) - Moist-air constants and state relations
//! - **Aerosol** ([`aerosol`]) - Multimodal lognormal dry-size distributions keyed by kappa
//! - **Spectra** ([`spectrum`]) - Output spectrum definitions and bin edges
//! - **Chemistry** ([`chem`]) - Gas-phase and aqueous-phase species registry
//! - **Archive I/O** ([`io`]) - Dimension/variable/attribute archive and its back ends

pub mod aerosol;
pub mod chem;
pub mod io;
pub mod spectrum;
pub mod thermo;
