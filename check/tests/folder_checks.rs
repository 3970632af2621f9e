//! Check suite runs against scratch model folders.

use std::fs;
use std::path::Path;

use radiance_folder::{redistribute_sensors, RedistributeOptions};
use radiance_folder_check::{run_all, FolderPaths, Severity};

fn write(root: &Path, file: &str, content: &str) {
    let path = root.join(file);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn paths(root: &Path) -> FolderPaths {
    FolderPaths {
        project: root.to_path_buf(),
        model: "model".to_string(),
        redistributed: None,
    }
}

fn valid_model(root: &Path) {
    for ext in ["rad", "mat", "blk"] {
        write(root, &format!("model/scene/envelope.{ext}"), "");
    }
    write(
        root,
        "model/aperture_group/states.json",
        r#"{"south": [{"identifier": "clear", "default": "south..default.rad",
            "direct": "south..direct.rad", "black": "south..black.rad", "tmtx": "clear.xml"}]}"#,
    );
    for file in ["south..default.rad", "south..direct.rad", "south..black.rad"] {
        write(root, &format!("model/aperture_group/{file}"), "");
    }
    write(root, "model/bsdf/clear.xml", "");
    write(
        root,
        "model/grid/_info.json",
        r#"[{"identifier": "room", "full_id": "room", "count": 3}]"#,
    );
    write(root, "model/grid/room.pts", "0 0 0 0 0 1\n1 0 0 0 0 1\n2 0 0 0 0 1\n");
}

#[test]
fn valid_model_passes() {
    let dir = tempfile::tempdir().unwrap();
    valid_model(dir.path());
    let report = run_all(&paths(dir.path())).unwrap();
    let failures: Vec<_> = report.results.iter().filter(|r| r.is_failure()).collect();
    assert!(failures.is_empty(), "unexpected failures: {failures:#?}");
    assert_eq!(report.warning_count(), 0);
    assert_eq!(report.pass_count(), report.results.len());
}

#[test]
fn missing_state_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    valid_model(dir.path());
    fs::remove_file(dir.path().join("model/bsdf/clear.xml")).unwrap();
    let report = run_all(&paths(dir.path())).unwrap();
    let failure = report
        .results
        .iter()
        .find(|r| r.validator == "states" && r.is_failure())
        .unwrap();
    assert!(failure.message.contains("tmtx"));
}

#[test]
fn unmatched_modifier_fails() {
    let dir = tempfile::tempdir().unwrap();
    valid_model(dir.path());
    write(dir.path(), "model/scene/context.rad", "");
    let report = run_all(&paths(dir.path())).unwrap();
    let failure = report
        .results
        .iter()
        .find(|r| r.validator == "modifiers" && r.is_failure())
        .unwrap();
    assert_eq!(failure.details, ["model/scene/context.rad"]);
}

#[test]
fn grid_count_mismatch_and_orphans_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    valid_model(dir.path());
    write(dir.path(), "model/grid/room.pts", "0 0 0 0 0 1\n");
    write(dir.path(), "model/grid/extra.pts", "0 0 0 0 0 1\n");
    let report = run_all(&paths(dir.path())).unwrap();
    let grids: Vec<_> = report
        .results
        .iter()
        .filter(|r| r.validator == "grids")
        .collect();
    assert!(grids.iter().any(|r| r.is_failure()));
    let warning = grids
        .iter()
        .find(|r| r.severity == Severity::Warning)
        .unwrap();
    assert!(warning.details[0].ends_with("extra.pts"));
}

#[test]
fn redistributed_folder_is_checked() {
    let dir = tempfile::tempdir().unwrap();
    valid_model(dir.path());
    write(dir.path(), "model/grid/hall.pts", "0 0 0 0 0 1\n1 0 0 0 0 1\n");
    write(
        dir.path(),
        "model/grid/_info.json",
        r#"[{"identifier": "room", "full_id": "room", "count": 3},
            {"identifier": "hall", "full_id": "hall", "count": 2}]"#,
    );
    let dist = dir.path().join("dist");
    redistribute_sensors(
        &dir.path().join("model/grid"),
        &dist,
        &RedistributeOptions {
            min_sensor_count: 1,
            ..RedistributeOptions::new(2)
        },
    )
    .unwrap();

    let mut check_paths = paths(dir.path());
    check_paths.redistributed = Some(dist.clone());
    assert!(run_all(&check_paths).unwrap().all_passed());

    write(
        dir.path(),
        "dist/_redist_info.json",
        r#"[{"identifier": "room", "dist_info": [{"identifier": 0, "st_ln": 0, "end_ln": 1}]}]"#,
    );
    let report = run_all(&check_paths).unwrap();
    let failure = report
        .results
        .iter()
        .find(|r| r.validator == "redist" && r.is_failure())
        .unwrap();
    assert!(!failure.details.is_empty());
}
