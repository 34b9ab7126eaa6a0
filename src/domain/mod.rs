mod campaign;
mod campaign_stats;
mod error;
mod owner;
mod subscriber;
mod subscriber_email;

pub use campaign::*;
pub use campaign_stats::*;
pub use error::*;
pub use owner::*;
pub use subscriber::*;
pub use subscriber_email::*;
