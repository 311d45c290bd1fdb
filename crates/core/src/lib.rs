pub mod category;
pub mod money;
pub mod report;
pub mod transaction;

pub use category::{Categories, CategoryError, MainCategory, SubCategory, EXPENSES};
pub use money::Money;
pub use report::{Cell, OutputRow, Report, HEADER_ROWS};
pub use transaction::{SharedTransaction, Transaction};
