//! Stochastic simulation of a virus population inside a patient, with
//! optional drug treatment and inherited drug resistance.
//!
//! The core model lives in [`virus`] and [`patient`]; [`engine`],
//! [`analysis`] and [`manager`] run and average repeated trials.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod manager;
pub mod patient;
pub mod stats;
pub mod types;
pub mod virus;

mod utils;

pub use error::SimError;
pub use patient::{Patient, TreatedPatient};
pub use virus::{NoOffspring, Reproduction, Resistance, Virus};
