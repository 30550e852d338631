pub mod artist;
pub mod scoring;
pub mod season;
pub mod team;
pub mod wager;

pub use artist::*;
pub use scoring::*;
pub use season::*;
pub use team::*;
pub use wager::*;
