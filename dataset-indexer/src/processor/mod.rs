mod table_processor;

pub use table_processor::{MergeStrategy, TableProcessor};
