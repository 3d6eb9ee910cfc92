//! Shop Registry
//!
//! Loads shop definitions from TOML files and holds each merchant's live stock.

use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use super::definition::{Shop, ShopDefinition};
use crate::data;
use crate::error::DataError;

/// Registry for all merchant shops
pub struct ShopRegistry {
    shops: HashMap<String, Shop>,
}

impl ShopRegistry {
    pub fn new() -> Self {
        Self {
            shops: HashMap::new(),
        }
    }

    /// Load all shop definitions from `<data_dir>/shops`
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<usize, DataError> {
        let path = data_dir.join("shops");
        if !path.exists() {
            warn!("Shop directory does not exist: {:?}", path);
            return Ok(0);
        }

        let mut count = 0;
        for file_path in data::files_with_extension(&path, "toml")? {
            let def: ShopDefinition = data::read_toml(&file_path)?;
            let shop = Shop::from_definition(def).map_err(|reason| DataError::Invalid {
                path: file_path.clone(),
                reason,
            })?;

            if self.shops.contains_key(&shop.id) {
                warn!("Duplicate shop ID '{}' in {:?}, overwriting", shop.id, file_path);
            }
            self.shops.insert(shop.id.clone(), shop);
            count += 1;
        }

        info!("Loaded {} shop definitions", self.shops.len());
        Ok(count)
    }

    pub fn insert(&mut self, shop: Shop) {
        if self.shops.contains_key(&shop.id) {
            warn!("Duplicate shop ID '{}', overwriting", shop.id);
        }
        self.shops.insert(shop.id.clone(), shop);
    }

    pub fn get(&self, shop_id: &str) -> Option<&Shop> {
        self.shops.get(shop_id)
    }

    pub fn get_mut(&mut self, shop_id: &str) -> Option<&mut Shop> {
        self.shops.get_mut(shop_id)
    }

    /// Shop IDs in sorted order
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.shops.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn contains(&self, shop_id: &str) -> bool {
        self.shops.contains_key(shop_id)
    }

    pub fn len(&self) -> usize {
        self.shops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shops.is_empty()
    }
}

impl Default for ShopRegistry {
    fn default() -> Self {
        Self::new()
    }
}
