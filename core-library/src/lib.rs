//! # Library Management Module
//!
//! Owns the sheet-music library and the playlists built on top of it.
//!
//! ## Overview
//!
//! This module manages:
//! - Imported items and their rendered pages ([`LibraryManager`])
//! - Playlists and their ordered, duplicate-free membership ([`PlaylistManager`])
//! - Resolving playlist members into items for display ([`hydrate`])
//! - Versioned record schemas for everything persisted ([`records`])
//!
//! Both managers are write-through caches over a `RecordStore`: the store is
//! written first and the in-memory state only changes once that succeeded.

pub mod error;
pub mod hydrate;
pub mod library;
pub mod models;
pub mod naming;
pub mod playlists;
pub mod records;

pub use error::{LibraryError, Result};
pub use hydrate::{hydrate, HydrationCache, HydrationKey};
pub use library::{LibraryManager, LibrarySnapshot};
pub use models::{HydratedPlaylist, Playlist, PlaylistId, SheetMusicId, SheetMusicItem};
pub use playlists::{MembershipOutcome, PlaylistManager, PlaylistSnapshot, RemovalOutcome};
