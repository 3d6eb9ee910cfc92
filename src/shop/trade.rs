//! Buying and Selling
//!
//! Trades move items between a merchant's stock and the player's inventory,
//! paid in a currency item. A failed trade leaves both inventories untouched.

use tracing::debug;

use super::definition::Shop;
use crate::error::{InventoryError, TradeError};
use crate::item::Inventory;

/// Summary of a completed trade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeReceipt {
    pub item_id: String,
    pub quantity: u32,
    /// Currency paid (buy) or received (sell)
    pub coins: u32,
}

impl Shop {
    /// Player buys `quantity` of `item_id` from this merchant
    pub fn buy(
        &mut self,
        player: &mut Inventory,
        item_id: &str,
        quantity: u32,
        currency: &str,
    ) -> Result<TradeReceipt, TradeError> {
        if quantity == 0 {
            return Err(TradeError::InvalidQuantity);
        }
        let offer = self.offer(item_id).ok_or_else(|| TradeError::NotTraded {
            merchant_id: self.id.clone(),
            item_id: item_id.to_string(),
        })?;
        let cost = offer
            .buy_price
            .checked_mul(quantity)
            .ok_or(TradeError::InvalidQuantity)?;

        let available = self.stock.count(item_id);
        if available < quantity {
            return Err(InventoryError::InsufficientQuantity {
                item_id: item_id.to_string(),
                requested: quantity,
                available,
            }
            .into());
        }

        ensure_room(player, item_id, quantity)?;

        if cost > 0 {
            player.remove_item(currency, cost)?;
        }
        self.stock.remove_item(item_id, quantity)?;
        player.add_item(item_id, quantity);

        debug!("Bought {} x{} from '{}' for {}", item_id, quantity, self.id, cost);
        Ok(TradeReceipt {
            item_id: item_id.to_string(),
            quantity,
            coins: cost,
        })
    }

    /// Player sells `quantity` of `item_id` to this merchant
    pub fn sell(
        &mut self,
        player: &mut Inventory,
        item_id: &str,
        quantity: u32,
        currency: &str,
    ) -> Result<TradeReceipt, TradeError> {
        if quantity == 0 {
            return Err(TradeError::InvalidQuantity);
        }
        let offer = self.offer(item_id).ok_or_else(|| TradeError::NotTraded {
            merchant_id: self.id.clone(),
            item_id: item_id.to_string(),
        })?;
        let payment = offer
            .sell_price
            .checked_mul(quantity)
            .ok_or(TradeError::InvalidQuantity)?;

        if payment > 0 {
            ensure_room(player, currency, payment)?;
        }
        ensure_room(&self.stock, item_id, quantity)?;

        player.remove_item(item_id, quantity)?;
        if payment > 0 {
            player.add_item(currency, payment);
        }
        self.stock.add_item(item_id, quantity);

        debug!("Sold {} x{} to '{}' for {}", item_id, quantity, self.id, payment);
        Ok(TradeReceipt {
            item_id: item_id.to_string(),
            quantity,
            coins: payment,
        })
    }
}

fn ensure_room(inventory: &Inventory, item_id: &str, quantity: u32) -> Result<(), TradeError> {
    if inventory.has_room_for(item_id, quantity) {
        Ok(())
    } else {
        Err(TradeError::StackFull {
            item_id: item_id.to_string(),
        })
    }
}
