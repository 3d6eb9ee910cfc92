//! Shop Definition Structures
//!
//! Merchant price lists and stock, as loaded from TOML and as held at runtime.

use serde::{Deserialize, Serialize};

use crate::item::Inventory;

/// A shop as written in `data/shops/*.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopDefinition {
    /// Merchant NPC id that runs this shop
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub offers: Vec<PriceOffer>,
    #[serde(default)]
    pub stock: Vec<ShopStockItem>,
}

/// What a merchant charges and pays for one item, in currency units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceOffer {
    pub item: String,
    pub buy_price: u32,
    pub sell_price: u32,
}

/// Starting stock for one item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopStockItem {
    pub item: String,
    pub quantity: u32,
}

/// A merchant with live stock
#[derive(Debug, Clone)]
pub struct Shop {
    pub id: String,
    pub display_name: String,
    pub offers: Vec<PriceOffer>,
    pub stock: Inventory,
}

impl Shop {
    pub fn new(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            offers: Vec::new(),
            stock: Inventory::new(),
        }
    }

    pub fn with_offer(mut self, item: &str, buy_price: u32, sell_price: u32) -> Self {
        self.offers.push(PriceOffer {
            item: item.to_string(),
            buy_price,
            sell_price,
        });
        self
    }

    pub fn with_stock(mut self, item: &str, quantity: u32) -> Self {
        self.stock.add_item(item, quantity);
        self
    }

    /// Resolve a loaded definition into a shop with its starting stock
    pub fn from_definition(def: ShopDefinition) -> Result<Self, String> {
        if def.id.is_empty() {
            return Err("shop id is empty".to_string());
        }

        let mut stock = Inventory::new();
        for entry in &def.stock {
            if entry.quantity == 0 {
                return Err(format!("shop '{}' stocks zero '{}'", def.id, entry.item));
            }
            if !def.offers.iter().any(|o| o.item == entry.item) {
                return Err(format!(
                    "shop '{}' stocks '{}' without a price",
                    def.id, entry.item
                ));
            }
            stock.add_item(&entry.item, entry.quantity);
        }

        Ok(Self {
            id: def.id,
            display_name: def.display_name,
            offers: def.offers,
            stock,
        })
    }

    /// Price entry for an item, if the merchant trades it
    pub fn offer(&self, item_id: &str) -> Option<&PriceOffer> {
        self.offers.iter().find(|o| o.item == item_id)
    }
}
