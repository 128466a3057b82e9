mod translator;

pub use translator::{pivot_bucket_key, translate_table, TableContext, TableMapping};

pub(crate) use translator::artifact_flag_name;
