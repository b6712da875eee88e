//! The shipped map catalogs validate cleanly.

use std::path::PathBuf;

use td_tools::validate::validate_maps_directory;

#[test]
fn test_shipped_maps_are_valid() {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/maps");
    let report = validate_maps_directory(&dir).unwrap();
    assert!(report.files >= 1);
    assert!(report.maps >= 3);
    assert!(report.is_clean(), "problems: {:?}", report.problems);
}
