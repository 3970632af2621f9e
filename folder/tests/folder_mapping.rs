//! Folder-level grid mapping, scene mapping and receivers on a sample model.

use std::fs;
use std::path::Path;

use radiance_folder::{Error, ModelFolder, Phase, STATIC_APERTURES};
use serde_json::{json, Value};

const STATES: &str = r#"{
    "south_window": [
        {"identifier": "0_clear", "default": "./south_window..default..000.rad",
         "direct": "./south_window..direct..000.rad", "black": "./south_window..black.rad",
         "tmtx": "clear.xml", "vmtx": "./south_window..mtx.rad"},
        {"identifier": "1_diffuse", "default": "./south_window..default..001.rad",
         "direct": "./south_window..direct..001.rad", "black": "./south_window..black.rad",
         "tmtx": "diffuse.xml", "vmtx": "./south_window..mtx.rad"}
    ],
    "north_window": [
        {"identifier": "0_open", "default": "./north_window..default..000.rad",
         "direct": "./north_window..direct..000.rad", "black": "./north_window..black.rad"},
        {"identifier": "1_closed", "default": "./north_window..default..001.rad",
         "direct": "./north_window..direct..001.rad", "black": "./north_window..black.rad"}
    ]
}"#;

const GRIDS: &str = r#"[
    {"identifier": "office", "name": "office", "full_id": "office", "group": "",
     "count": 4, "light_path": [["south_window"], ["__static_apertures__"]]},
    {"identifier": "hall", "name": "hall", "full_id": "hall", "group": "",
     "count": 2, "light_path": [["north_window"]]},
    {"identifier": "core", "name": "core", "full_id": "core", "group": "", "count": 3}
]"#;

fn write(root: &Path, file: &str, content: &str) {
    let path = root.join(file);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Builds `project/model` with a scene, one static aperture, two aperture
/// groups and three grids.
fn sample_folder(root: &Path) -> ModelFolder {
    for stem in ["scene/envelope", "scene/context", "aperture/aperture"] {
        for ext in ["rad", "mat", "blk"] {
            write(root, &format!("model/{stem}.{ext}"), "");
        }
    }
    write(root, "model/aperture_group/states.json", STATES);
    write(root, "model/grid/_info.json", GRIDS);
    ModelFolder::new(root, "model").unwrap()
}

fn keys(buckets: &Value) -> Vec<&str> {
    buckets
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["identifier"].as_str().unwrap())
        .collect()
}

#[test]
fn grid_mapping_routes_by_light_path() {
    let dir = tempfile::tempdir().unwrap();
    let folder = sample_folder(dir.path());
    folder.grid_mapping(Phase::Five, false).unwrap();

    let written: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("grid_mapping.json")).unwrap())
            .unwrap();
    assert_eq!(keys(&written["two_phase"]), ["north_window", STATIC_APERTURES]);
    assert_eq!(keys(&written["three_phase"]), ["south_window"]);
    assert_eq!(written["three_phase"], written["five_phase"]);
    assert_eq!(written["three_phase"][0]["grid"][0]["identifier"], "office");
    assert_eq!(written["two_phase"][1]["grid"][0]["identifier"], "core");
}

#[test]
fn two_phase_mapping_has_no_matrix_keys() {
    let dir = tempfile::tempdir().unwrap();
    let folder = sample_folder(dir.path());
    let mapping = folder.grid_mapping(Phase::Two, true).unwrap();
    let json = serde_json::to_value(&mapping).unwrap();
    assert_eq!(
        json.as_object().unwrap().keys().collect::<Vec<_>>(),
        ["two_phase"]
    );
    assert_eq!(keys(&json["two_phase"]), ["south_window", "north_window"]);
}

#[test]
fn scene_mapping_lists_pass_files() {
    let dir = tempfile::tempdir().unwrap();
    let folder = sample_folder(dir.path());
    let mapping = folder.octree_scene_mapping(Phase::Five, false).unwrap();

    let static_entry = &mapping.two_phase[0];
    assert_eq!(static_entry.identifier, STATIC_APERTURES);
    assert_eq!(
        static_entry.scene_files.as_deref().unwrap(),
        [
            "model/scene/context.mat",
            "model/scene/context.rad",
            "model/scene/envelope.mat",
            "model/scene/envelope.rad",
            "model/aperture/aperture.mat",
            "model/aperture/aperture.rad",
            "model/aperture_group/south_window..black.rad",
            "model/aperture_group/north_window..black.rad",
        ]
    );

    let open = &mapping.two_phase[1];
    assert_eq!((open.light_path.as_str(), open.identifier.as_str()), ("north_window", "0_open"));
    assert_eq!(
        open.scene_files_direct,
        [
            "model/scene/context.blk",
            "model/scene/context.rad",
            "model/scene/envelope.blk",
            "model/scene/envelope.rad",
            "model/aperture/aperture.blk",
            "model/aperture/aperture.rad",
            "model/aperture_group/north_window..default..000.rad",
            "model/aperture_group/south_window..black.rad",
        ]
    );

    let three = mapping.three_phase.as_ref().unwrap();
    assert_eq!(three.len(), 1);
    assert_eq!(
        three[0].scene_files.as_deref().unwrap().last().unwrap(),
        "model/aperture_group/north_window..black.rad"
    );
    let five = mapping.five_phase.as_ref().unwrap();
    assert_eq!(
        five.iter().map(|e| e.identifier.as_str()).collect::<Vec<_>>(),
        ["0_clear", "1_diffuse"]
    );
    assert!(five[1]
        .scene_files_direct
        .contains(&"model/aperture_group/south_window..direct..001.rad".to_string()));
    assert!(dir.path().join("scene_mapping.json").is_file());
}

#[test]
fn unmatched_scene_geometry_fails_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let folder = sample_folder(dir.path());
    fs::remove_file(dir.path().join("model/scene/context.mat")).unwrap();
    let err = folder.octree_scene_mapping(Phase::Three, false).unwrap_err();
    match err {
        Error::UnmatchedModifier { geometry } => assert!(geometry.ends_with("context.rad")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn combined_receivers_skip_grids_without_matrices() {
    let dir = tempfile::tempdir().unwrap();
    let folder = sample_folder(dir.path());
    let receivers = folder.combined_receivers("receiver", true).unwrap();
    assert_eq!(receivers.len(), 1);
    assert_eq!(receivers[0].identifier, "office");
    assert_eq!(receivers[0].aperture_groups, ["south_window"]);

    let receiver_folder = dir.path().join("model/receiver");
    let content = fs::read_to_string(receiver_folder.join("office..receiver.rad")).unwrap();
    assert_eq!(
        content,
        "# office..receiver.rad\n\
         #@rfluxmtx o=south_window..office.vmx\n\
         !xform ./model/aperture_group/south_window..mtx.rad\n"
    );
    let info: Value =
        serde_json::from_str(&fs::read_to_string(receiver_folder.join("_info.json")).unwrap())
            .unwrap();
    assert_eq!(
        info,
        json!([{"identifier": "office", "count": 4, "path": "office..receiver.rad",
                "aperture_groups": ["south_window"]}])
    );
    assert_eq!(folder.receiver_files().unwrap(), ["model/receiver/office..receiver.rad"]);
}

#[test]
fn black_files_respect_exclusions() {
    let dir = tempfile::tempdir().unwrap();
    let folder = sample_folder(dir.path());
    assert!(folder.has_aperture_group());
    assert!(folder.has_aperture().unwrap());
    assert_eq!(
        folder.aperture_group_files_black(&["south_window"]).unwrap(),
        ["model/aperture_group/north_window..black.rad"]
    );
}
