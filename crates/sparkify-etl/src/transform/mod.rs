//! Typed input records and per-table row accumulators

pub mod activity;
pub mod song;
pub mod songplay;
pub mod time;

pub use activity::{ActivityRecord, UserRow, UsersAccumulator};
pub use song::{ArtistRow, ArtistsAccumulator, SongRecord, SongRow, SongsAccumulator};
pub use songplay::{JoinStats, SongPlayEvent, SongplayRow, SongplaysAccumulator, join_songplays};
pub use time::{TimeAccumulator, TimeParts};
