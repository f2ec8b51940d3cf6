//! Business spawn and fleet seeding.
//!
//! Both stages iterate existing entities while creating new ones, so they
//! first collect intents and then apply them in a second pass.

use crate::catalog::Catalog;
use crate::event::{EconomyEvent, EventLog};
use crate::fixed::{Ticks, non_negative};
use crate::geometry::Vec3;
use crate::id::*;
use crate::world::{BusinessOwner, BusinessState, Carrier, World};
use log::debug;

/// Offset from the colony at which seeded ships appear.
const SHIP_SPAWN_OFFSET: Vec3 = Vec3 {
    x: 0.0,
    y: 0.0,
    z: 10.0,
};

#[derive(Debug, Clone, Copy)]
enum PendingOwner {
    Unresolved,
    Existing(OwnerRef),
    Create(OwnerKind),
}

#[derive(Debug)]
struct SpawnIntent {
    colony: ColonyId,
    kind: BusinessKindId,
    owner_kind: OwnerKind,
    owner: PendingOwner,
    facility: Option<FacilityId>,
    facility_class: Option<FacilityClass>,
}

fn resolve_owner(world: &World, owner_kind: OwnerKind, faction: Option<FactionId>) -> PendingOwner {
    match owner_kind {
        OwnerKind::Faction => match faction {
            Some(f) => PendingOwner::Existing(OwnerRef::Faction(f)),
            None => PendingOwner::Unresolved,
        },
        OwnerKind::Empire => {
            let Some(f) = faction else {
                return PendingOwner::Unresolved;
            };
            let empire = world
                .factions
                .get(f)
                .and_then(|rec| rec.empire)
                .filter(|e| world.empires.contains_key(*e));
            match empire {
                Some(e) => PendingOwner::Existing(OwnerRef::Empire(e)),
                None => PendingOwner::Existing(OwnerRef::Faction(f)),
            }
        }
        OwnerKind::Group | OwnerKind::Individual => PendingOwner::Create(owner_kind),
    }
}

/// Spawn one business per catalog archetype in every colony that has not
/// been through spawn yet. Returns the number of businesses created.
pub fn spawn_businesses(
    world: &mut World,
    catalog: &Catalog,
    now: Ticks,
    events: &mut EventLog,
) -> u32 {
    let pending: Vec<ColonyId> = world
        .colonies
        .iter()
        .filter(|(_, c)| !c.businesses_spawned)
        .map(|(id, _)| id)
        .collect();
    if pending.is_empty() {
        return 0;
    }

    let mut intents = Vec::new();
    for &colony in &pending {
        let faction = world
            .colonies
            .get(colony)
            .and_then(|c| c.faction)
            .filter(|f| world.factions.contains_key(*f));

        for (kind, def) in catalog.businesses() {
            let facility = match def.primary_facility {
                Some(class) => match world.facility_of_class(colony, class) {
                    Some(f) => Some(f),
                    None => continue,
                },
                None => None,
            };
            intents.push(SpawnIntent {
                colony,
                kind,
                owner_kind: def.owner_kind,
                owner: resolve_owner(world, def.owner_kind, faction),
                facility,
                facility_class: def.primary_facility,
            });
        }
    }

    let mut spawned = 0;
    for intent in intents {
        let Some(def) = catalog.business(intent.kind) else {
            continue;
        };
        let faction = world.colonies.get(intent.colony).and_then(|c| c.faction);
        let owner = match intent.owner {
            PendingOwner::Unresolved => None,
            PendingOwner::Existing(owner) => Some(owner),
            PendingOwner::Create(kind) => Some(OwnerRef::Private(world.owners.insert(
                BusinessOwner {
                    kind,
                    home_colony: intent.colony,
                    faction,
                    created_tick: now,
                    job_role: None,
                },
            ))),
        };

        let mut state = BusinessState::new(intent.kind, intent.owner_kind, intent.colony, now);
        state.owner = owner;
        state.facility = intent.facility;
        state.facility_class = intent.facility_class;
        state.credits = non_negative(def.starting_credits);
        for (_, job) in catalog.jobs_for(intent.kind) {
            for input in &job.inputs {
                let seed = catalog
                    .resource(input.resource)
                    .map(|r| r.seed_amount)
                    .unwrap_or_default();
                state.ledger.seed(input.resource, seed);
            }
            for output in &job.outputs {
                state.ledger.ensure_entry(output.resource);
            }
        }

        let business = world.businesses.insert(state);
        if let Some(facility) = intent.facility {
            let asset = AssetRef::Facility(facility);
            if world.ownership.owner_of(asset).is_none() {
                world.ownership.assign(business, asset, now, &def.name);
            }
        }
        debug!(
            "spawned business {} ({business:?}) at colony {:?}",
            def.name, intent.colony
        );
        events.emit(EconomyEvent::BusinessSpawned {
            business,
            kind: intent.kind,
            colony: intent.colony,
            tick: now,
        });
        spawned += 1;
    }

    for colony in pending {
        if let Some(c) = world.colonies.get_mut(colony) {
            c.businesses_spawned = true;
        }
    }
    spawned
}

/// Give every business whose archetype names a starter hull, and that owns
/// no ship yet, one carrier at its colony. Returns the number of ships made.
pub fn seed_fleets(world: &mut World, catalog: &Catalog, now: Ticks, events: &mut EventLog) -> u32 {
    let mut settled = Vec::new();
    let mut intents = Vec::new();

    for (id, business) in world.businesses.iter().filter(|(_, b)| !b.fleet_seeded) {
        settled.push(id);
        if world.ownership.owns_any(id, AssetType::Ship) {
            continue;
        }
        let Some(hull) = catalog
            .business(business.kind)
            .and_then(|def| def.starter_hull.as_deref())
            .filter(|h| !h.is_empty())
        else {
            continue;
        };
        let Some(colony) = world.colonies.get(business.colony) else {
            continue;
        };
        intents.push((id, colony.position + SHIP_SPAWN_OFFSET, colony.faction, hull.to_string()));
    }

    let mut seeded = 0;
    for (business, position, faction, hull) in intents {
        let mut carrier = Carrier::new(position);
        carrier.faction = faction;
        carrier.hull = Some(hull.clone());
        let ship = world.add_carrier(carrier);
        world.ownership.assign(business, AssetRef::Ship(ship), now, &hull);
        debug!("seeded {hull} carrier {ship:?} for business {business:?}");
        events.emit(EconomyEvent::FleetSeeded {
            business,
            carrier: ship,
            tick: now,
        });
        seeded += 1;
    }

    for id in settled {
        if let Some(b) = world.businesses.get_mut(id) {
            b.fleet_seeded = true;
        }
    }
    seeded
}
