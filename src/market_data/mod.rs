pub mod company_master;
pub mod price_store;
pub mod raw_table;

pub use company_master::CompanyMaster;
pub use price_store::{PriceObservation, PriceStore};
pub use raw_table::load_raw_prices;
