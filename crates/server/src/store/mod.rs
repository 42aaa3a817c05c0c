mod config_store;
mod in_memory;
mod nacos;

pub use config_store::{dispatch, ConfigListener, ConfigStore, ListenerId, StoreError};
pub use in_memory::InMemoryConfigStore;
pub use nacos::{NacosConfigStore, NacosSettings};
