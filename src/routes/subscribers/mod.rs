mod manage;
mod unsubscribe;

pub use manage::*;
pub use unsubscribe::*;
