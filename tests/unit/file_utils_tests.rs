/*!
 * Tests for file naming and directory utilities
 */

use scriptvox::file_utils::FileManager;

use crate::common;

#[test]
fn test_ensureDir_shouldCreateNestedDirectories() {
    let dir = common::create_temp_dir().unwrap();
    let nested = dir.path().join("a/b/c");

    FileManager::ensure_dir(&nested).unwrap();
    assert!(nested.is_dir());

    // Second call is a no-op
    FileManager::ensure_dir(&nested).unwrap();
}

#[test]
fn test_stagingAndLineNames_shouldNotCollide() {
    let staging = FileManager::staging_file_name("JOHN", 3, "wav");
    let final_name = FileManager::line_file_name("JOHN", 3, "wav");
    assert_eq!(staging, "JOHN_seq_000003.wav");
    assert_eq!(final_name, "JOHN_line_003.wav");
    assert_ne!(staging, final_name);
}

#[test]
fn test_sanitize_shouldKeepKeysReadable() {
    assert_eq!(FileManager::sanitize_file_component("O'BRIEN"), "O'BRIEN");
    assert_eq!(FileManager::sanitize_file_component("MARY-JANE"), "MARY-JANE");
    assert_eq!(FileManager::sanitize_file_component("  BIG  BOB "), "BIG__BOB");
}
