//! Colony Core -- the production and business economy engine for a space
//! colony strategy game.
//!
//! This crate provides colony reserves and markets, business ledgers, the
//! job scheduler, procurement, the market bridge, carrier export, bulk
//! haulers, tech propagation, and deterministic fixed-point arithmetic
//! shared by every stage.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::Engine::step`] advances the economy by one tick:
//!
//! 1. **Spawn** -- Create businesses for new colonies and seed starter fleets.
//! 2. **Feed** -- Population generates and consumes colony reserves.
//! 3. **Tech** -- Recompute research unlocks from colony tech levels.
//! 4. **Procurement** -- Businesses top up job inputs from reserves, then markets.
//! 5. **Jobs** -- Finish due jobs and start the best-scoring candidate.
//! 6. **Bridge** -- Export business surplus to reserves or the market.
//! 7. **Export** -- Carriers parked near a colony unload into its reserves.
//! 8. **Haulers** -- Move bulk cargo from carriers into colony reserves.
//! 9. **Propagation** -- Drop dead ownership links and apply unlocks to assets.
//! 10. **Bookkeeping** -- Report telemetry and compute the state hash.
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- Owns the world and runs the pipeline.
//! - [`world::World`] -- Slot maps of colonies, facilities, ships, haulers,
//!   businesses, and owners, plus the [`ownership::OwnershipGraph`].
//! - [`catalog::Catalog`] -- Immutable resource, job, and business archetype
//!   definitions (frozen at startup).
//! - [`ledger::Ledger`] -- Capacity-bounded storage with reservations.
//! - [`stock::ColonyIndustryStock`] -- Colony-level reserve pools.
//! - [`market::Market`] -- Per-colony supply and price table.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.

pub mod bridge;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod event;
pub mod export;
pub mod feed;
pub mod fixed;
pub mod geometry;
pub mod hauler;
pub mod id;
pub mod ledger;
pub mod market;
pub mod ownership;
pub mod procurement;
pub mod profiling;
pub mod scheduler;
pub mod sim;
pub mod spawn;
pub mod stock;
pub mod tech;
pub mod telemetry;
pub mod validation;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
