pub mod advertisement;
pub mod merge;
pub mod messages;
pub mod neighbor;
pub mod routing_table;
pub mod task_manager;

pub use merge::MergeOutcome;
pub use messages::*;
pub use neighbor::*;
pub use routing_table::*;
