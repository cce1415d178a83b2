// Commands module - imports all individual command files
pub mod clans;
pub mod debug;
pub mod lookup;
pub mod ping;
pub mod track;

// Re-export all commands for easy access from main.rs
pub use clans::clans;
pub use debug::debug;
pub use lookup::lookup_clan_tag;
pub use ping::ping;
pub use track::{track, untrack};
