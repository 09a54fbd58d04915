//! Output side of the pipeline: content filtering and playlist rendering

pub mod filter_engine;
pub mod generator;

pub use filter_engine::ContentFilter;
pub use generator::{
    PlaylistDefinition, PlaylistEntry, PlaylistFormat, PlaylistRenderer, PlaylistSelection,
    RenderedPlaylist, WrittenPlaylist, write_playlists,
};
