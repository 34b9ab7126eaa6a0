mod campaigns;
mod check_health;
mod dashboard;
mod error;
mod subscribers;

pub use campaigns::*;
pub use check_health::*;
pub use dashboard::*;
pub use error::*;
pub use subscribers::*;
