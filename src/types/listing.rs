//! Listing inventory counters touched by the settlement core

use super::transaction::{ListingId, SellerId};
use serde::{Deserialize, Serialize};

/// Listing (product) inventory state
///
/// Counters are signed: stock updates are best-effort and a listing may be
/// oversold without the core rejecting the status change that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    pub seller_id: SellerId,
    pub name: String,
    pub stock: i64,
    #[serde(rename = "sold_out")]
    pub sold_out: i64,
}

impl Listing {
    /// Create a listing with the given stock and nothing sold
    pub fn new(id: impl Into<ListingId>, seller_id: impl Into<SellerId>, stock: i64) -> Self {
        let id = id.into();
        Listing {
            name: id.clone(),
            id,
            seller_id: seller_id.into(),
            stock,
            sold_out: 0,
        }
    }
}

/// Atomic change applied to a listing's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    pub stock_delta: i64,
    pub sold_out_delta: i64,
}

impl StockAdjustment {
    /// Goods leave the warehouse: stock down, sold up
    pub fn dispatch(qty: u32) -> Self {
        StockAdjustment {
            stock_delta: -i64::from(qty),
            sold_out_delta: i64::from(qty),
        }
    }

    /// Goods come back after a refund: stock up, sold down
    pub fn restock(qty: u32) -> Self {
        StockAdjustment {
            stock_delta: i64::from(qty),
            sold_out_delta: -i64::from(qty),
        }
    }

    /// Apply the adjustment in place
    pub fn apply(&self, listing: &mut Listing) {
        listing.stock = listing.stock.saturating_add(self.stock_delta);
        listing.sold_out = listing.sold_out.saturating_add(self.sold_out_delta);
    }
}
