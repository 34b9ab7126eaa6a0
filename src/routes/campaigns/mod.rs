mod manage;
mod send;

pub use manage::*;
pub use send::*;
