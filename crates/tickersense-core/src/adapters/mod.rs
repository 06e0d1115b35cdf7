mod newsapi;
mod yahoo;

pub use newsapi::NewsApiClient;
pub use yahoo::{YahooAdapter, YahooAuthManager};
