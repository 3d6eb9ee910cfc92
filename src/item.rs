use serde::Serialize;
use tracing::debug;

use crate::error::InventoryError;

// ============================================================================
// Item Stacks
// ============================================================================

/// A quantity of one item kind. Quantity is always at least 1 while the stack
/// is part of an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemStack {
    pub item_id: String,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(item_id: &str, quantity: u32) -> Self {
        Self {
            item_id: item_id.to_string(),
            quantity,
        }
    }
}

// ============================================================================
// Inventory
// ============================================================================

/// An ordered, appendable collection of stacks with at most one stack per item kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Inventory {
    stacks: Vec<ItemStack>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an inventory from `(item, quantity)` pairs, merging repeats
    pub fn from_stacks<'a>(stacks: impl IntoIterator<Item = (&'a str, u32)>) -> Self {
        let mut inventory = Self::new();
        for (item_id, quantity) in stacks {
            inventory.add_item(item_id, quantity);
        }
        inventory
    }

    /// Add items, merging into the existing stack of that kind or appending a
    /// new one.
    ///
    /// `quantity` must be at least 1. A stack saturates at `u32::MAX`.
    pub fn add_item(&mut self, item_id: &str, quantity: u32) {
        debug_assert!(quantity >= 1, "add_item called with zero quantity");

        match self.stacks.iter_mut().find(|s| s.item_id == item_id) {
            Some(stack) => stack.quantity = stack.quantity.saturating_add(quantity),
            None => self.stacks.push(ItemStack::new(item_id, quantity)),
        }
        debug!("Added {}x{} to inventory", quantity, item_id);
    }

    /// Remove items from the first matching stack, deleting the stack when it
    /// empties. Never clamps: if the stack holds less than `quantity` nothing
    /// changes.
    pub fn remove_item(&mut self, item_id: &str, quantity: u32) -> Result<(), InventoryError> {
        let index = self.stacks.iter().position(|s| s.item_id == item_id);
        let available = index.map(|i| self.stacks[i].quantity).unwrap_or(0);

        let index = match index {
            Some(i) if available >= quantity => i,
            _ => {
                return Err(InventoryError::InsufficientQuantity {
                    item_id: item_id.to_string(),
                    requested: quantity,
                    available,
                });
            }
        };

        let stack = &mut self.stacks[index];
        stack.quantity -= quantity;
        if stack.quantity == 0 {
            self.stacks.remove(index);
        }
        debug!("Removed {}x{} from inventory", quantity, item_id);
        Ok(())
    }

    pub fn find_stack(&self, item_id: &str) -> Option<&ItemStack> {
        self.stacks.iter().find(|s| s.item_id == item_id)
    }

    /// Quantity held of an item kind (0 if absent)
    pub fn count(&self, item_id: &str) -> u32 {
        self.find_stack(item_id).map(|s| s.quantity).unwrap_or(0)
    }

    /// Whether `quantity` more of an item fits in its stack
    pub fn has_room_for(&self, item_id: &str, quantity: u32) -> bool {
        self.count(item_id).checked_add(quantity).is_some()
    }

    pub fn stacks(&self) -> &[ItemStack] {
        &self.stacks
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }
}

// ============================================================================
// Inventory Store
// ============================================================================

/// A non-player inventory shown beside the player's (a chest, a merchant's wares)
#[derive(Debug, Clone)]
pub struct Counterpart {
    pub owner_id: String,
    pub inventory: Inventory,
}

/// The player's inventory plus an optional counterpart collection
#[derive(Debug, Clone, Default)]
pub struct InventoryStore {
    player: Inventory,
    counterpart: Option<Counterpart>,
}

impl InventoryStore {
    pub fn new(player: Inventory) -> Self {
        Self {
            player,
            counterpart: None,
        }
    }

    /// Add to the player's inventory
    pub fn add_item(&mut self, item_id: &str, quantity: u32) {
        self.player.add_item(item_id, quantity);
    }

    /// Remove from the player's inventory
    pub fn remove_item(&mut self, item_id: &str, quantity: u32) -> Result<(), InventoryError> {
        self.player.remove_item(item_id, quantity)
    }

    pub fn find_stack(&self, item_id: &str) -> Option<&ItemStack> {
        self.player.find_stack(item_id)
    }

    pub fn player(&self) -> &Inventory {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Inventory {
        &mut self.player
    }

    pub fn counterpart(&self) -> Option<&Counterpart> {
        self.counterpart.as_ref()
    }

    pub fn set_counterpart(&mut self, owner_id: &str, inventory: Inventory) {
        self.counterpart = Some(Counterpart {
            owner_id: owner_id.to_string(),
            inventory,
        });
    }

    pub fn clear_counterpart(&mut self) -> Option<Counterpart> {
        self.counterpart.take()
    }
}
