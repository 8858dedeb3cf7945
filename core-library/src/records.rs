//! Versioned record schemas
//!
//! Every persisted record is a [`StoredRecord`] envelope whose `data` is JSON.
//! The envelope carries the id and the schema version; the JSON carries the
//! rest of the model.
//!
//! | Version | Pages stored as                         |
//! |---------|-----------------------------------------|
//! | 0       | `data:` URL strings (legacy, read only) |
//! | 1       | `{ "mimeType", "data" }`, base64 data   |
//!
//! Version 0 rows come from browser databases written before records carried
//! an envelope; the IndexedDB store hands them over as the raw row JSON.
//! Older versions are upgraded on decode and written back in the current
//! shape on the next save. Newer versions are rejected.

use std::collections::HashSet;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::conversion::PageImage;
use bridge_traits::storage::{Collection, StoredRecord};
use serde::{Deserialize, Serialize};

use crate::error::{LibraryError, Result};
use crate::models::{Playlist, PlaylistId, SheetMusicId, SheetMusicItem};

pub const SHEET_MUSIC_SCHEMA_VERSION: u32 = 1;
pub const PLAYLIST_SCHEMA_VERSION: u32 = 1;

const LEGACY_SCHEMA_VERSION: u32 = 0;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageRecord {
    mime_type: String,
    data: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetMusicRecord {
    name: String,
    pages: Vec<PageRecord>,
    created_at: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacySheetMusicRecord {
    name: String,
    pages: Vec<String>,
    #[serde(default)]
    created_at: i64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistRecord {
    name: String,
    item_ids: Vec<String>,
    created_at: i64,
    updated_at: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPlaylistRecord {
    name: String,
    #[serde(default)]
    item_ids: Vec<String>,
    #[serde(default)]
    created_at: i64,
}

pub fn encode_item(item: &SheetMusicItem) -> Result<StoredRecord> {
    let record = SheetMusicRecord {
        name: item.name.clone(),
        pages: item
            .pages
            .iter()
            .map(|page| PageRecord {
                mime_type: page.mime_type.clone(),
                data: STANDARD.encode(&page.data),
            })
            .collect(),
        created_at: item.created_at,
    };

    Ok(StoredRecord::new(
        item.id.as_str(),
        SHEET_MUSIC_SCHEMA_VERSION,
        serde_json::to_string(&record)?,
    ))
}

pub fn decode_item(record: &StoredRecord) -> Result<SheetMusicItem> {
    let id = SheetMusicId::from_string(record.id.clone());

    match record.schema_version {
        LEGACY_SCHEMA_VERSION => {
            let legacy: LegacySheetMusicRecord = serde_json::from_str(&record.data)?;
            let pages = legacy
                .pages
                .iter()
                .map(|url| page_from_data_url(url))
                .collect::<Result<Vec<_>>>()?;
            Ok(SheetMusicItem {
                id,
                name: legacy.name,
                pages,
                created_at: legacy.created_at,
            })
        }
        SHEET_MUSIC_SCHEMA_VERSION => {
            let current: SheetMusicRecord = serde_json::from_str(&record.data)?;
            let pages = current
                .pages
                .into_iter()
                .map(|page| -> Result<PageImage> {
                    Ok(PageImage::new(page.mime_type, STANDARD.decode(page.data)?))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(SheetMusicItem {
                id,
                name: current.name,
                pages,
                created_at: current.created_at,
            })
        }
        version => Err(LibraryError::UnsupportedSchema {
            collection: Collection::SheetMusic,
            id: record.id.clone(),
            version,
        }),
    }
}

pub fn encode_playlist(playlist: &Playlist) -> Result<StoredRecord> {
    let record = PlaylistRecord {
        name: playlist.name.clone(),
        item_ids: playlist
            .item_ids
            .iter()
            .map(|id| id.as_str().to_string())
            .collect(),
        created_at: playlist.created_at,
        updated_at: playlist.updated_at,
    };

    Ok(StoredRecord::new(
        playlist.id.as_str(),
        PLAYLIST_SCHEMA_VERSION,
        serde_json::to_string(&record)?,
    ))
}

pub fn decode_playlist(record: &StoredRecord) -> Result<Playlist> {
    let id = PlaylistId::from_string(record.id.clone());

    let (name, item_ids, created_at, updated_at) = match record.schema_version {
        LEGACY_SCHEMA_VERSION => {
            let legacy: LegacyPlaylistRecord = serde_json::from_str(&record.data)?;
            (legacy.name, legacy.item_ids, legacy.created_at, legacy.created_at)
        }
        PLAYLIST_SCHEMA_VERSION => {
            let current: PlaylistRecord = serde_json::from_str(&record.data)?;
            (
                current.name,
                current.item_ids,
                current.created_at,
                current.updated_at,
            )
        }
        version => {
            return Err(LibraryError::UnsupportedSchema {
                collection: Collection::Playlists,
                id: record.id.clone(),
                version,
            })
        }
    };

    // Members are unique; a record listing one twice keeps the first slot.
    let mut seen = HashSet::new();
    let item_ids = item_ids
        .into_iter()
        .filter(|item_id| seen.insert(item_id.clone()))
        .map(SheetMusicId::from_string)
        .collect();

    Ok(Playlist {
        id,
        name,
        item_ids,
        created_at,
        updated_at,
    })
}

/// Parse `data:<mime>;base64,<payload>`.
fn page_from_data_url(url: &str) -> Result<PageImage> {
    let invalid = || LibraryError::Serialization("page is not a base64 data URL".to_string());

    let rest = url.strip_prefix("data:").ok_or_else(invalid)?;
    let (header, payload) = rest.split_once(',').ok_or_else(invalid)?;
    let mime_type = header.strip_suffix(";base64").ok_or_else(invalid)?;
    let mime_type = if mime_type.is_empty() {
        "application/octet-stream"
    } else {
        mime_type
    };

    Ok(PageImage::new(mime_type, STANDARD.decode(payload)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> SheetMusicItem {
        SheetMusicItem::new(
            "Nocturne",
            vec![
                PageImage::png(vec![0x89, 0x50, 0x4e, 0x47]),
                PageImage::new("image/jpeg", vec![0xff, 0xd8]),
            ],
            1_700_000_000_000,
        )
    }

    #[test]
    fn test_item_encodes_current_version() {
        let item = sample_item();
        let record = encode_item(&item).unwrap();

        assert_eq!(record.id, item.id.as_str());
        assert_eq!(record.schema_version, SHEET_MUSIC_SCHEMA_VERSION);
        assert!(record.data.contains(r#""mimeType":"image/jpeg""#));
        assert_eq!(decode_item(&record).unwrap(), item);
    }

    #[test]
    fn test_legacy_item_is_upgraded() {
        let record = StoredRecord::new(
            "legacy-1",
            0,
            r#"{"name":"Old Etude","pages":["data:image/png;base64,AQID"]}"#,
        );

        let item = decode_item(&record).unwrap();
        assert_eq!(item.id.as_str(), "legacy-1");
        assert_eq!(item.name, "Old Etude");
        assert_eq!(item.pages, vec![PageImage::png(vec![1u8, 2, 3])]);
        assert_eq!(item.created_at, 0);

        let upgraded = encode_item(&item).unwrap();
        assert_eq!(upgraded.schema_version, SHEET_MUSIC_SCHEMA_VERSION);
    }

    #[test]
    fn test_legacy_page_must_be_data_url() {
        let record = StoredRecord::new(
            "legacy-2",
            0,
            r#"{"name":"Broken","pages":["https://example.invalid/page.png"]}"#,
        );
        assert!(matches!(
            decode_item(&record),
            Err(LibraryError::Serialization(_))
        ));
    }

    #[test]
    fn test_newer_schema_rejected() {
        let record = StoredRecord::new("future", 7, "{}");
        match decode_playlist(&record) {
            Err(LibraryError::UnsupportedSchema {
                collection,
                id,
                version,
            }) => {
                assert_eq!(collection, Collection::Playlists);
                assert_eq!(id, "future");
                assert_eq!(version, 7);
            }
            other => panic!("expected UnsupportedSchema, got {:?}", other),
        }
    }

    #[test]
    fn test_playlist_keeps_member_order() {
        let mut playlist = Playlist::new("Recital", 10);
        playlist.item_ids = vec![
            SheetMusicId::from_string("c"),
            SheetMusicId::from_string("a"),
            SheetMusicId::from_string("b"),
        ];
        playlist.updated_at = 20;

        let decoded = decode_playlist(&encode_playlist(&playlist).unwrap()).unwrap();
        assert_eq!(decoded, playlist);
    }

    #[test]
    fn test_legacy_playlist_without_members() {
        let record = StoredRecord::new("p-old", 0, r#"{"name":"Scales"}"#);
        let playlist = decode_playlist(&record).unwrap();
        assert_eq!(playlist.name, "Scales");
        assert!(playlist.item_ids.is_empty());
    }

    #[test]
    fn test_duplicate_members_collapse_on_decode() {
        let legacy = StoredRecord::new(
            "p-dup",
            0,
            r#"{"name":"Etudes","itemIds":["x","y","x","x"]}"#,
        );
        let playlist = decode_playlist(&legacy).unwrap();
        assert_eq!(
            playlist.item_ids,
            vec![SheetMusicId::from_string("x"), SheetMusicId::from_string("y")]
        );

        let current = StoredRecord::new(
            "p-dup-1",
            PLAYLIST_SCHEMA_VERSION,
            r#"{"name":"Etudes","itemIds":["y","y"],"createdAt":1,"updatedAt":2}"#,
        );
        let playlist = decode_playlist(&current).unwrap();
        assert_eq!(playlist.item_ids, vec![SheetMusicId::from_string("y")]);
    }

    #[test]
    fn test_corrupt_json_is_serialization_error() {
        let record = StoredRecord::new("bad", 1, "{not json");
        assert!(matches!(
            decode_item(&record),
            Err(LibraryError::Serialization(_))
        ));
    }
}
