pub mod mapping;
pub mod settings;

pub use mapping::YamlSymbolMap;
pub use settings::{Operation, Settings};
