pub mod catalog;
pub mod debounce;
pub mod notify;
pub mod search;
pub mod session;
pub mod trailer;
pub mod trending;

pub use catalog::{MovieCatalog, TmdbCatalog};
pub use notify::{Notification, Notifier};
pub use search::{SearchOrchestrator, SearchView};
pub use session::{MovieSession, PresentationView, SessionSettings};
pub use trailer::TrailerResolver;
pub use trending::TrendingAggregator;
