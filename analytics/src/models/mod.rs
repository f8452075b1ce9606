pub mod dashboard;
pub mod metric;
pub mod report;

pub use dashboard::*;
pub use metric::*;
pub use report::*;
