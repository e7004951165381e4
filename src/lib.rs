//! # RelaySim - Topology generator for multi-hop wireless relay simulations
//!
//! This library builds the physical topology of a hierarchical relay network
//! (one base station, a variable number of relay nodes, four end-user nodes)
//! inside a regular grid of building obstructions, resolves the attachment of
//! every relay and end-user to its nearest candidate parent, and hands the
//! resulting node/device graph to a compact link-level simulation engine.
//!
//! ## Overview
//!
//! A scenario run proceeds strictly downward through the modules:
//!
//! 1. `buildings` generates the deterministic obstruction grid.
//! 2. `topology::layout` computes node positions for the selected layout
//!    policy (keyed by relay count).
//! 3. `topology::nodes` instantiates the network nodes and registers them
//!    with the engine to obtain device handles.
//! 4. `topology::attachment` wires relays to the base-station-rooted set and,
//!    after a scheduled delay, end-users to the combined base-station/relay
//!    set.
//! 5. `export` serializes the resolved topology to gnuplot directive files
//!    and a JSON registry.
//! 6. `engine` drives downlink traffic over the resolved graph until the
//!    configured stop time.
//!
//! ## Architecture
//!
//! - `config`: type-safe scenario configuration with YAML defaults and CLI
//!   overrides
//! - `buildings`: obstruction grid construction and area computation
//! - `topology`: positions, node records, and attachment resolution
//! - `engine`: event scheduler, device registry, and traffic applications
//! - `ip`: IPv4 assignment and default routes for end-user devices
//! - `export`: plotting-command and registry file output
//! - `scenario`: high-level orchestration of a complete run
//!
//! ## Error Handling
//!
//! Modules expose typed errors via `thiserror`; the orchestration layer and
//! binary report them through `color_eyre` with context. Export failures are
//! the one deliberate exception: plot output is diagnostic, so a pass that
//! cannot open its target is logged and skipped.

pub mod buildings;
pub mod config;
pub mod engine;
pub mod export;
pub mod ip;
pub mod scenario;
pub mod topology;
