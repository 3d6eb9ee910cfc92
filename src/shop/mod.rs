pub mod definition;
pub mod registry;
pub mod trade;

pub use definition::{PriceOffer, Shop, ShopDefinition, ShopStockItem};
pub use registry::ShopRegistry;
pub use trade::TradeReceipt;
