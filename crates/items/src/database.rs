//! Parsed items.dat plus the on-disk cache file.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use gtbridge_proto::ByteReader;
use tracing::{error, info, warn};

use crate::item::Item;

/// Highest database version the item layout is known for.
const MAX_KNOWN_VERSION: u16 = 24;

/// The client item database, keyed by sequential item id.
#[derive(Debug, Clone, Default)]
pub struct ItemDatabase {
    version: u16,
    count: u32,
    items: Vec<Item>,
}

impl ItemDatabase {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a whole items.dat blob, replacing previous contents.
    ///
    /// Returns `false` when the header or any entry is truncated; entries
    /// parsed before the bad one are kept.
    pub fn parse(&mut self, data: &[u8]) -> bool {
        self.clear();

        let mut reader = ByteReader::new(data);
        let (Some(version), Some(count)) = (reader.read_u16(), reader.read_u32()) else {
            error!("Failed to read items.dat header");
            return false;
        };
        self.version = version;
        self.count = count;

        info!("Parsing items.dat: version={version}, count={count}");

        if version > MAX_KNOWN_VERSION {
            warn!("Unsupported items.dat version: {version}, max supported is {MAX_KNOWN_VERSION}");
        }

        for index in 0..count {
            let Some(item) = Item::parse(&mut reader, version) else {
                error!("Failed to parse item at index {index}");
                return false;
            };
            if item.id != index {
                warn!(
                    "Item ID mismatch at index {index}: expected {index}, got {}",
                    item.id
                );
            }
            self.items.push(item);
        }

        info!("Successfully parsed {} items from items.dat", self.items.len());
        true
    }

    /// Item by id, when the id is in range.
    pub fn get_item(&self, id: u32) -> Option<&Item> {
        self.items.get(id as usize)
    }

    /// Database header version.
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Item count the header declared.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Number of items actually parsed.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no items are loaded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops all parsed state.
    pub fn clear(&mut self) {
        self.version = 0;
        self.count = 0;
        self.items.clear();
    }

    /// Reads and parses the cache file at `path`.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = fs::read(path)
            .with_context(|| format!("Failed to open items.dat: {}", path.display()))?;
        if !self.parse(&data) {
            bail!("Failed to parse items.dat: {}", path.display());
        }
        Ok(())
    }
}

/// Persists a raw items.dat blob at `path`, creating parent directories.
pub fn save_to_file(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory {}", parent.display())
            })?;
        }
    }
    fs::write(path, data)
        .with_context(|| format!("Failed to write items.dat cache {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::crypt_name;
    use gtbridge_proto::ByteWriter;

    fn write_item(writer: &mut ByteWriter, id: u32, name: &str, version: u16) {
        writer.write_u32(id);
        writer.write_u16(0);
        writer.write_u8(0);
        writer.write_u8(0);

        let encrypted = crypt_name(name.as_bytes(), id);
        writer.write_u16(encrypted.len() as u16);
        writer.write_bytes(&encrypted);

        writer.write_string_u16("tiles.rttex");
        writer.write_u32(0);
        writer.write_u8(0);
        writer.write_u32(0);
        writer.write_u8(0);
        writer.write_u8(0);
        writer.write_u8(0);
        writer.write_u8(0);
        writer.write_u8(0);
        writer.write_u8(4);
        writer.write_u32(0);
        writer.write_u8(0);
        writer.write_u16(1);
        writer.write_u8(200);
        writer.write_string_u16("");
        writer.write_u32(0);
        writer.write_u32(0);
        for _ in 0..4 {
            writer.write_string_u16("");
        }
        writer.write_u8(0);
        writer.write_u8(0);
        writer.write_u8(0);
        writer.write_u8(0);
        writer.write_u32(0);
        writer.write_u32(0);
        writer.write_u32(0);
        writer.write_u32(0);
        writer.write_u32(0);
        for _ in 0..3 {
            writer.write_string_u16("");
        }
        writer.write_u32(0);
        writer.write_u32(0);
        writer.write_u32(0);
        writer.write_bytes(&[0; 60]);
        writer.write_u32(0);
        writer.write_u32(0);
        writer.write_string_u16("");
        writer.write_u32(0);
        writer.write_bytes(&[0; 9]);
        writer.write_u32(0);
        writer.write_u32(0);
        writer.write_u8(0);
        for _ in 0..6 {
            writer.write_u32(0);
        }
        writer.write_string_u16("");
        writer.write_string_u16("");
        writer.write_u32(0);
        writer.write_i32(0);
        writer.write_bytes(&[0; 9]);
        writer.write_u16(0);
        writer.write_string_u16("A test block.");
        writer.write_u16(0);
        writer.write_u16(0);
        if version >= 24 {
            writer.write_u8(0);
        }
    }

    fn build_database(version: u16, names: &[&str]) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_u16(version);
        writer.write_u32(names.len() as u32);
        for (index, name) in names.iter().enumerate() {
            write_item(&mut writer, index as u32, name, version);
        }
        writer.into_inner()
    }

    #[test]
    fn test_parse_decrypts_names() {
        let data = build_database(24, &["Blank", "Dirt", "Dirt Seed"]);
        let mut database = ItemDatabase::new();
        assert!(database.parse(&data));
        assert_eq!(database.version(), 24);
        assert_eq!(database.count(), 3);
        assert_eq!(database.len(), 3);

        let dirt = database.get_item(1).expect("item 1 should exist");
        assert_eq!(dirt.name, "Dirt");
        assert_eq!(dirt.texture_file, "tiles.rttex");
        assert!(database.get_item(3).is_none());
    }

    #[test]
    fn test_parse_handles_pre_24_layout() {
        let data = build_database(23, &["Blank", "Dirt"]);
        let mut database = ItemDatabase::new();
        assert!(database.parse(&data));
        assert_eq!(database.len(), 2);
        assert_eq!(database.get_item(1).expect("item 1").name, "Dirt");
    }

    #[test]
    fn test_parse_rejects_truncated_blob() {
        let mut data = build_database(24, &["Blank", "Dirt"]);
        data.truncate(data.len() - 10);
        let mut database = ItemDatabase::new();
        assert!(!database.parse(&data));
    }

    #[test]
    fn test_parse_rejects_short_header() {
        let mut database = ItemDatabase::new();
        assert!(!database.parse(&[24]));
    }

    #[test]
    fn test_parse_replaces_previous_contents() {
        let mut database = ItemDatabase::new();
        assert!(database.parse(&build_database(24, &["Blank", "Dirt"])));
        assert!(database.parse(&build_database(24, &["Blank"])));
        assert_eq!(database.len(), 1);
    }

    #[test]
    fn test_cache_file_roundtrip() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("resources").join("items.dat");

        let data = build_database(24, &["Blank", "Dirt"]);
        save_to_file(&path, &data).expect("Failed to persist cache");

        let mut database = ItemDatabase::new();
        database
            .load_from_file(&path)
            .expect("Failed to load cache");
        assert_eq!(database.len(), 2);
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut database = ItemDatabase::new();
        assert!(database.load_from_file(dir.path().join("items.dat")).is_err());
    }
}
