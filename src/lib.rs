//! # Transient Pipeline
//!
//! A task orchestration engine for astronomical transient-event enrichment
//! pipelines.
//!
//! When a survey discovers a transient (a supernova candidate, a tidal
//! disruption event), a chain of follow-up steps turns the bare detection
//! into science: match a host galaxy, download survey cutouts, look up the
//! host redshift, fit photometric apertures, measure fluxes, and fit the
//! host SED. This library provides the bookkeeping that drives such a chain
//! reliably: a durable per-(transient, task) status register, prerequisite
//! gating between steps, oldest-first scheduling, and an execution harness
//! with crash recovery.
//!
//! ## Core Problem Solved
//!
//! Enrichment workloads have awkward operational properties:
//!
//! - **Steps depend on each other**: photometry is meaningless without an
//!   aperture, and SED fitting needs both fluxes and a redshift
//! - **Steps fail routinely**: catalogs time out, surveys lack coverage,
//!   fits diverge - one bad transient must not stall the rest
//! - **Workers crash mid-step**: a claim that is never released would park a
//!   transient forever
//! - **Backlogs are the norm**: archival ingests register thousands of
//!   transients at once, and the oldest should be enriched first
//!
//! ## Key Features
//!
//! - **Durable Status Register**: one entry per (transient, task) pair,
//!   behind pluggable in-memory, file, and Postgres store backends
//! - **Closed Catalogs**: every task name and status label is declared at
//!   startup; anything else fails loudly at the first use
//! - **Prerequisite Gating**: runners declare the upstream statuses they
//!   need; eligibility is computed by successive set intersections
//! - **Atomic Claims**: a conditional status update enforces at most one
//!   in-flight invocation per entry, even over a shared store
//! - **Crash Recovery**: a reconciliation sweep releases stale claims back
//!   to the queue
//! - **Audit Trail**: claims, commits, failures, and requeues are recorded
//!   with processing durations
//!
//! ## Driving a Pipeline
//!
//! ```rust,ignore
//! use transient_pipeline::builders::build_memory_engine;
//! use transient_pipeline::config::PipelineConfig;
//! use transient_pipeline::core::{RunOutcome, Transient};
//! use transient_pipeline::runners::HostMatchRunner;
//!
//! let cfg = PipelineConfig::default();
//! let engine = build_memory_engine(&cfg)?;
//!
//! engine.initialize_register(&Transient::new(
//!     "2022xyz",
//!     1_654_041_600_000,
//!     201.3,
//!     -43.0,
//! ))?;
//!
//! let runner = HostMatchRunner::new(my_catalog_matcher);
//! match engine.run_once(&runner).await? {
//!     RunOutcome::Committed { transient, status, .. } => {
//!         println!("{transient}: {status}");
//!     }
//!     RunOutcome::Idle => {}
//! }
//! ```
//!
//! For complete examples, see:
//! - `tests/scheduling_pipeline_test.rs` - Full integration tests
//! - `README.md` - Comprehensive documentation

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Catalogs, the status register, selection, and the execution harness.
pub mod core;
/// Configuration models for catalogs, stores, and scheduling cadence.
pub mod config;
/// Builders to construct engines from configuration.
pub mod builders;
/// Store backends for the register and artifacts.
pub mod infra;
/// Concrete enrichment steps and their collaborator traits.
pub mod runners;
/// Trigger loops and the read-only API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
