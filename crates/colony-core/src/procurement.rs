//! Procurement: top up business ledgers from colony stock, then the market.
//!
//! For each business the stage computes, per input resource, the largest
//! per-cycle requirement across the jobs its archetype may run, multiplied by
//! the desired cycle count. Whatever the ledger holds below that target is
//! pulled from the colony's reserve first and bought from the colony market
//! second. Each resource moves at most `max_procure_per_tick` units per run.

use crate::catalog::Catalog;
use crate::config::SimulationConfig;
use crate::event::{EconomyEvent, EventLog};
use crate::fixed::{Fixed64, Ticks, non_negative};
use crate::id::{BusinessId, BusinessKindId, ResourceTypeId};
use crate::world::World;
use log::{trace, warn};

/// Units of each input resource a business of `kind` tries to keep on hand.
pub fn desired_buffer(
    catalog: &Catalog,
    config: &SimulationConfig,
    kind: BusinessKindId,
) -> Vec<(ResourceTypeId, Fixed64)> {
    let multiplier = config.desired_multiplier();
    catalog
        .per_cycle_inputs(kind)
        .into_iter()
        .filter(|(_, per_cycle)| *per_cycle > Fixed64::ZERO)
        .map(|(resource, per_cycle)| (resource, per_cycle.saturating_mul(multiplier)))
        .collect()
}

/// Totals moved by one procurement run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcurementReport {
    pub pulled_from_stock: Fixed64,
    pub purchased: Fixed64,
    pub credits_spent: Fixed64,
}

pub fn run_procurement(
    world: &mut World,
    catalog: &Catalog,
    config: &SimulationConfig,
    now: Ticks,
    events: &mut EventLog,
) -> ProcurementReport {
    let cap = config.max_procure();
    let mut report = ProcurementReport::default();
    if cap <= Fixed64::ZERO {
        return report;
    }

    let World {
        businesses,
        colonies,
        ..
    } = world;

    let ids: Vec<BusinessId> = businesses.keys().collect();
    for id in ids {
        let Some(business) = businesses.get_mut(id) else {
            continue;
        };
        let Some(colony) = colonies.get_mut(business.colony) else {
            continue;
        };

        let mut stock_touched = false;
        for (resource, desired) in desired_buffer(catalog, config, business.kind) {
            let current = business.ledger.amount(resource);
            if current >= desired {
                continue;
            }
            let missing = (desired - current)
                .min(cap)
                .min(business.ledger.headroom(resource));
            if missing <= Fixed64::ZERO {
                continue;
            }
            let mut remaining = missing;

            if let (Some(stock), Some(pool)) = (colony.stock.as_mut(), catalog.stock_pool_for(resource)) {
                let pulled = stock.pull(pool, remaining);
                if pulled > Fixed64::ZERO {
                    let overflow = business.ledger.add(resource, pulled);
                    if overflow > Fixed64::ZERO {
                        warn!("procurement overflow of {overflow} returned to {} reserve", pool.name());
                        stock.deposit(pool, overflow);
                    }
                    let moved = pulled - overflow;
                    remaining = non_negative(remaining - moved);
                    stock_touched = true;
                    report.pulled_from_stock += moved;
                    trace!("business {id:?} pulled {moved} of {resource:?} from stock");
                    events.emit(EconomyEvent::Procured {
                        business: id,
                        resource,
                        amount: moved,
                        tick: now,
                    });
                }
            }

            if remaining <= Fixed64::ZERO {
                continue;
            }
            let (Some(market), Some(category)) = (colony.market.as_mut(), catalog.market_for(resource)) else {
                continue;
            };
            let credits_before = business.credits;
            let bought = market.purchase(category, remaining, &mut business.credits);
            if bought > Fixed64::ZERO {
                let overflow = business.ledger.add(resource, bought);
                if overflow > Fixed64::ZERO {
                    // Headroom was checked above; put any remainder back on sale.
                    market.deposit(category, overflow);
                }
                let received = bought - overflow;
                report.purchased += received;
                report.credits_spent += credits_before - business.credits;
                trace!("business {id:?} bought {received} of {resource:?}");
                events.emit(EconomyEvent::Purchased {
                    business: id,
                    resource,
                    amount: received,
                    tick: now,
                });
            }
        }

        if stock_touched {
            if let Some(stock) = colony.stock.as_mut() {
                stock.last_update_tick = now;
            }
        }
    }
    report
}
