pub mod browser;
pub mod indeed;
pub mod traits;
pub mod types;
pub mod vdab;

pub use browser::IndeedAdapter;
pub use traits::JobSource;
pub use types::{SearchParams, SourceRecord};
pub use vdab::VdabAdapter;
