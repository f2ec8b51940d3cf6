//! Business-to-asset ownership graph.
//!
//! One business owns many assets; an asset has at most one owner. Links are
//! kept per business in assignment order, with a reverse index from asset to
//! owner so re-parenting can drop the stale link before inserting the new one.

use crate::fixed::Ticks;
use crate::id::{AssetRef, AssetType, BusinessId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLink {
    pub asset: AssetRef,
    pub asset_type: AssetType,
    pub assigned_tick: Ticks,
    /// Catalog id the asset was created from (hull, facility template).
    /// Empty when unknown.
    pub catalog_id: String,
}

/// What an [`OwnershipGraph::assign`] call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    Inserted,
    /// The link existed with an empty catalog id, which was filled in.
    CatalogIdUpdated,
    Unchanged,
    Reparented { from: BusinessId },
}

#[derive(Debug, Clone, Default)]
pub struct OwnershipGraph {
    links: BTreeMap<BusinessId, Vec<AssetLink>>,
    owners: BTreeMap<AssetRef, BusinessId>,
}

impl OwnershipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `asset` to `business`. Re-asserting an existing link changes at
    /// most its catalog id; assigning to a new business removes the old link
    /// first.
    pub fn assign(
        &mut self,
        business: BusinessId,
        asset: AssetRef,
        tick: Ticks,
        catalog_id: &str,
    ) -> AssignOutcome {
        let mut outcome = AssignOutcome::Inserted;
        if let Some(&current) = self.owners.get(&asset) {
            if current == business {
                let link = self
                    .links
                    .get_mut(&business)
                    .and_then(|links| links.iter_mut().find(|l| l.asset == asset));
                return match link {
                    Some(link) if link.catalog_id.is_empty() && !catalog_id.is_empty() => {
                        link.catalog_id = catalog_id.to_string();
                        AssignOutcome::CatalogIdUpdated
                    }
                    Some(_) => AssignOutcome::Unchanged,
                    None => {
                        self.push_link(business, asset, tick, catalog_id);
                        AssignOutcome::Inserted
                    }
                };
            }
            self.remove_link(current, asset);
            outcome = AssignOutcome::Reparented { from: current };
        }

        self.push_link(business, asset, tick, catalog_id);
        self.owners.insert(asset, business);
        outcome
    }

    fn push_link(&mut self, business: BusinessId, asset: AssetRef, tick: Ticks, catalog_id: &str) {
        self.links.entry(business).or_default().push(AssetLink {
            asset,
            asset_type: asset.asset_type(),
            assigned_tick: tick,
            catalog_id: catalog_id.to_string(),
        });
    }

    fn remove_link(&mut self, business: BusinessId, asset: AssetRef) -> Option<AssetLink> {
        let links = self.links.get_mut(&business)?;
        let index = links.iter().position(|l| l.asset == asset)?;
        let link = links.remove(index);
        if links.is_empty() {
            self.links.remove(&business);
        }
        Some(link)
    }

    /// Drop an asset's link. Returns the removed link.
    pub fn unassign(&mut self, asset: AssetRef) -> Option<AssetLink> {
        let owner = self.owners.remove(&asset)?;
        self.remove_link(owner, asset)
    }

    pub fn owner_of(&self, asset: AssetRef) -> Option<BusinessId> {
        self.owners.get(&asset).copied()
    }

    pub fn links(&self, business: BusinessId) -> &[AssetLink] {
        self.links.get(&business).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn owns_any(&self, business: BusinessId, asset_type: AssetType) -> bool {
        self.links(business).iter().any(|l| l.asset_type == asset_type)
    }

    /// Total number of links.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Remove links whose business or asset no longer exists. Returns the
    /// number of links removed.
    pub fn retain_valid(
        &mut self,
        business_alive: impl Fn(BusinessId) -> bool,
        asset_alive: impl Fn(AssetRef) -> bool,
    ) -> usize {
        let stale: Vec<AssetRef> = self
            .owners
            .iter()
            .filter(|&(asset, business)| !business_alive(*business) || !asset_alive(*asset))
            .map(|(asset, _)| *asset)
            .collect();
        for asset in &stale {
            self.unassign(*asset);
        }
        stale.len()
    }

    /// Every asset appears in exactly one business's link list and the
    /// reverse index agrees.
    pub fn is_consistent(&self) -> bool {
        let mut seen = 0usize;
        for (business, links) in &self.links {
            for link in links {
                if self.owners.get(&link.asset) != Some(business) {
                    return false;
                }
                seen += 1;
            }
        }
        seen == self.owners.len()
    }
}
