//! Gold economy: level-scaled prices, work payouts, and the conservation ledger
//!
//! Every gold movement in the simulation goes through `settle_use`,
//! `settle_work`, or `Treasury::inject`/`Treasury::absorb`, which keeps
//! `Σpawn + Σbuilding + tax_pool == injected + minted` true at all times.

use serde::{Deserialize, Serialize};

use crate::city::stockpile::ResourceStore;
use crate::content::ObjectDef;

/// Price growth per building level
pub const LEVEL_GROWTH: f64 = 1.15;

/// Work with a payout at or below this needs no buy-in
pub const BUY_IN_FREE_PAYOUT: u64 = 10;

/// Global gold ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasury {
    /// Taxes on use payments plus gold of deleted entities
    pub tax_pool: u64,
    /// Gold created by gold-source work payouts
    pub minted: u64,
    /// Gold introduced from outside (starting gold, building seed gold)
    pub injected: u64,
}

impl Treasury {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record gold entering the world from outside the economy
    pub fn inject(&mut self, amount: u64) {
        self.injected += amount;
    }

    /// Move the balance of a removed entity into the tax pool
    pub fn absorb(&mut self, amount: u64) {
        self.tax_pool += amount;
    }

    /// Total gold that must exist right now
    pub fn expected_total(&self) -> u128 {
        self.injected as u128 + self.minted as u128
    }
}

/// Why an economic transaction was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EconomyFailure {
    /// Producer-only buildings do not sell to consumers
    ProducerOnly,
    /// The pawn cannot pay the use cost
    InsufficientGold { cost: u64, available: u64 },
    /// The pawn's balance is under the work buy-in
    BelowBuyIn { required: u64, available: u64 },
    /// The building's store cannot cover the wage
    BuildingCannotPay { payout: u64, available: u64 },
    /// The building has no stock left to serve with
    OutOfStock,
}

/// `base × 1.15^level`, truncated
pub fn level_scaled(base: u64, level: u32) -> u64 {
    (base as f64 * LEVEL_GROWTH.powi(level as i32)).trunc() as u64
}

/// Price a consumer pays for one use at `level`
pub fn use_cost(def: &ObjectDef, level: u32) -> u64 {
    level_scaled(def.base_cost, level)
}

/// Wage for one completed work cycle at `level`
///
/// Ordinary buildings pay `cost × base_production`. Gold sources have no cost,
/// so they mint `base_production` scaled by level instead.
pub fn work_payout(def: &ObjectDef, level: u32) -> u64 {
    if def.is_gold_source() {
        level_scaled(def.base_production, level)
    } else {
        use_cost(def, level).saturating_mul(def.base_production)
    }
}

/// Minimum balance a pawn needs before taking work with this payout
pub fn buy_in(payout: u64) -> u64 {
    if payout <= BUY_IN_FREE_PAYOUT {
        0
    } else {
        payout / 2
    }
}

/// Whether a pawn could buy one use right now; returns the cost
pub fn check_use(
    def: &ObjectDef,
    level: u32,
    pawn_gold: u64,
    store: Option<&ResourceStore>,
) -> Result<u64, EconomyFailure> {
    if def.producer_only {
        return Err(EconomyFailure::ProducerOnly);
    }
    let cost = use_cost(def, level);
    if pawn_gold < cost {
        return Err(EconomyFailure::InsufficientGold {
            cost,
            available: pawn_gold,
        });
    }
    if let (Some(stock_def), Some(store)) = (&def.store, store) {
        if store.amount < stock_def.consume_per_use {
            return Err(EconomyFailure::OutOfStock);
        }
    }
    Ok(cost)
}

/// Whether a pawn may start work here; returns the payout
pub fn check_work(
    def: &ObjectDef,
    level: u32,
    pawn_gold: u64,
    building_gold: u64,
) -> Result<u64, EconomyFailure> {
    let payout = work_payout(def, level);
    let required = buy_in(payout);
    if pawn_gold < required {
        return Err(EconomyFailure::BelowBuyIn {
            required,
            available: pawn_gold,
        });
    }
    if !def.is_gold_source() && building_gold < payout {
        return Err(EconomyFailure::BuildingCannotPay {
            payout,
            available: building_gold,
        });
    }
    Ok(payout)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UseReceipt {
    pub cost: u64,
    pub tax: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkReceipt {
    pub payout: u64,
    pub minted: bool,
    pub restocked: u32,
}

/// Charge a pawn for one use; all-or-nothing
pub fn settle_use(
    def: &ObjectDef,
    level: u32,
    tax_percent: u64,
    pawn_gold: &mut u64,
    building_gold: &mut u64,
    store: Option<&mut ResourceStore>,
    treasury: &mut Treasury,
) -> Result<UseReceipt, EconomyFailure> {
    let cost = check_use(def, level, *pawn_gold, store.as_deref())?;
    if let (Some(stock_def), Some(store)) = (&def.store, store) {
        if !store.consume(stock_def.consume_per_use) {
            return Err(EconomyFailure::OutOfStock);
        }
    }
    let tax = cost * tax_percent.min(100) / 100;
    *pawn_gold -= cost;
    *building_gold += cost - tax;
    treasury.tax_pool += tax;
    Ok(UseReceipt { cost, tax })
}

/// Pay a pawn for one work cycle and restock the building; all-or-nothing
///
/// The buy-in is only checked when work starts, not here.
pub fn settle_work(
    def: &ObjectDef,
    level: u32,
    pawn_gold: &mut u64,
    building_gold: &mut u64,
    store: Option<&mut ResourceStore>,
    treasury: &mut Treasury,
) -> Result<WorkReceipt, EconomyFailure> {
    let payout = work_payout(def, level);
    let minted = def.is_gold_source();
    if minted {
        treasury.minted += payout;
    } else {
        if *building_gold < payout {
            return Err(EconomyFailure::BuildingCannotPay {
                payout,
                available: *building_gold,
            });
        }
        *building_gold -= payout;
    }
    *pawn_gold += payout;

    let restocked = match (&def.store, store) {
        (Some(stock_def), Some(store)) => store.add(stock_def.restock_per_work),
        _ => 0,
    };
    Ok(WorkReceipt {
        payout,
        minted,
        restocked,
    })
}
