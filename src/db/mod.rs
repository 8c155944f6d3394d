mod catalog;
mod postgres;
mod preferences;

pub use catalog::{CatalogStore, DailyMenuEntry, PgCatalogStore};
pub use postgres::create_pool;
pub use preferences::{PgPreferenceStore, PreferenceStore};

#[cfg(test)]
pub use catalog::MockCatalogStore;
#[cfg(test)]
pub use preferences::MockPreferenceStore;
