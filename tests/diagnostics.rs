use modelfoam::rendering::common::resource::ModelResourceLocation;
use modelfoam::rendering::dedup::diagnostics::{LOCATION_COUNTS_FILE, ModelCountReport, NAMESPACE_COUNTS_FILE, NAMES_FILE};
use std::fs;

fn keys() -> Vec<ModelResourceLocation> {
    [
        "minecraft:stone#normal",
        "minecraft:fence#east=true",
        "minecraft:fence#east=false",
        "othermod:ore#normal",
        "minecraft:apple#inventory",
    ]
    .into_iter()
    .map(|key| key.parse::<ModelResourceLocation>().unwrap())
    .collect()
}

#[test_log::test]
fn counts_are_sorted_by_frequency() {
    let report = ModelCountReport::collect(&keys());

    assert_eq!(report.names.first().map(String::as_str), Some("minecraft:apple#inventory"));
    assert_eq!(
        report.per_namespace,
        vec![("minecraft".to_string(), 4), ("othermod".to_string(), 1)]
    );
    assert_eq!(report.per_location[0], ("minecraft:fence".to_string(), 2));
    // Ties are ordered by name.
    assert_eq!(report.per_location[1], ("minecraft:apple".to_string(), 1));
}

#[test_log::test]
fn reports_are_written_to_the_dump_directory() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    ModelCountReport::collect(&keys()).write_to(dir.path())?;

    let names = fs::read_to_string(dir.path().join(NAMES_FILE))?;
    assert_eq!(names.lines().count(), 5);

    let namespaces = fs::read_to_string(dir.path().join(NAMESPACE_COUNTS_FILE))?;
    assert_eq!(namespaces, "minecraft: 4\nothermod: 1\n");

    let locations = fs::read_to_string(dir.path().join(LOCATION_COUNTS_FILE))?;
    assert_eq!(locations.lines().next(), Some("minecraft:fence: 2"));
    Ok(())
}

#[test_log::test]
fn writing_into_a_missing_directory_fails() {
    let report = ModelCountReport::collect(&keys());
    assert!(report.write_to(std::path::Path::new("/nonexistent/modelfoam/dump")).is_err());
}
