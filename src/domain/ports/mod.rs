pub mod config_store;
pub mod notifier;
pub mod sensor;
pub mod store;

pub use config_store::{ConfigStore, ConfigStoreError};
pub use notifier::{AlertSink, NotificationError};
pub use sensor::{SensorSource, SubsystemData};
pub use store::{HistoricalQuery, StoreError, TimeSeriesSink};
