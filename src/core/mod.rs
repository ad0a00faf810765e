//! Core table model, cleaning and I/O.

pub mod cleaning;
pub mod codes;
pub mod loaders;
pub mod table;
pub mod writers;

pub use loaders::{load_processed_csv, load_raw_csv, LoaderError};
pub use table::{Table, Value, KEY_COLUMN};
pub use writers::{write_table_csv, write_text_report, WriteError};
