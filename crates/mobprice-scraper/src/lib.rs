pub mod client;
pub mod compare;
pub mod currency;
pub mod error;
pub mod extract;
pub mod normalize;

pub use client::MobileClient;
pub use compare::{live_raw_prices, retain_favorable};
pub use currency::format_currency;
pub use error::ScraperError;
pub use extract::{extract_room_prices, extract_search_prices, Extraction, Strategy};
