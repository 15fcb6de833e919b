// Team domain: document model, roster management, court composition,
// live tally, statistics.

pub mod lineup;
pub mod migrate;
pub mod model;
pub mod roster;
pub mod stats;
pub mod tally;
