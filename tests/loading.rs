//! Library-level tests: sources on disk loaded through a workspace

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use arbor::test_utils::SampleArchive;
use arbor::{
    ArchiveKind, ArchiveState, DirectorySource, FilteredProjection, LoaderConfig, ManifestSource,
    NodeId, Notification, TreeFilter, Workspace, WorkspaceConfig,
};

const TIMEOUT: Duration = Duration::from_secs(30);

fn workspace() -> Workspace {
    Workspace::new(WorkspaceConfig {
        parallel_workers: 2,
        ..WorkspaceConfig::default()
    })
}

#[test]
fn test_package_and_records_load_side_by_side() {
    let archive = SampleArchive::new();
    let package = archive.package("Data.p4k");
    let manifest = archive.records("game.json");

    let mut ws = workspace();
    let data = ws.open(Arc::new(DirectorySource::new(package)), LoaderConfig::default());
    let game = ws.open(
        Arc::new(ManifestSource::open(&manifest).unwrap()),
        LoaderConfig::default(),
    );

    let mut completed = Vec::new();
    assert!(ws.wait_idle_with(TIMEOUT, |n| {
        if let Notification::LoadCompleted { archive, kind } = n {
            completed.push((*archive, *kind));
        }
    }));
    completed.sort_by_key(|(id, _)| *id);
    assert_eq!(
        completed,
        vec![(data, ArchiveKind::Package), (game, ArchiveKind::Records)]
    );
    assert!(ws.status().is_idle());

    let packaged = ws.index(data).unwrap();
    assert_eq!(packaged.leaf_count(), 4);
    assert!(packaged.lookup_by_path("DATA/textures/HULL.dds").is_some());

    let records = ws.index(game).unwrap();
    assert_eq!(records.leaf_count(), 3);
    let bullet = records
        .lookup_by_key("0a1b2c3d-0000-0000-0000-000000000002")
        .unwrap();
    assert_eq!(records.node(bullet).path(), "ammo/bullet");
    assert_eq!(records.node(bullet).type_label(), "AmmoParams");
    assert_eq!(ws.report(game).unwrap().renamed, 1);
}

#[test]
fn test_unopenable_content_root_fails_the_archive() {
    let archive = SampleArchive::new();
    let manifest = archive.manifest(
        "orphan.json",
        r#"{"label": "Orphan.dcb", "kind": "records", "content_root": "missing", "entries": []}"#,
    );

    let mut ws = workspace();
    let id = ws.open(
        Arc::new(ManifestSource::open(&manifest).unwrap()),
        LoaderConfig::default(),
    );
    assert!(ws.wait_idle(TIMEOUT));

    match ws.state(id) {
        Some(ArchiveState::Failed(message)) => assert!(message.contains("Orphan.dcb")),
        other => panic!("expected a failed archive, got {:?}", other),
    }
    let status = ws.status();
    assert!(!status.is_idle(), "failure stays visible until dismissed");
    assert!(status.message.contains("failed"), "{}", status.message);
}

#[test]
fn test_extract_filtered_selection() {
    let archive = SampleArchive::new();
    let package = archive.package("Data.p4k");
    let target = archive.path().join("out");

    let mut ws = workspace();
    let id = ws.open(Arc::new(DirectorySource::new(package)), LoaderConfig::default());
    assert!(ws.wait_idle(TIMEOUT));

    let index = Arc::clone(ws.index(id).unwrap());
    let projection =
        FilteredProjection::new(&index, TreeFilter::substring("textures"), Default::default());
    let selection = projection.leaves(&[NodeId::ROOT]);
    assert_eq!(selection.len(), 2);

    ws.extract(id, selection, target.clone()).unwrap();
    let mut reports = Vec::new();
    assert!(ws.wait_idle_with(TIMEOUT, |n| {
        if let Notification::ExtractionFinished { report, .. } = n {
            reports.push(report.clone());
        }
    }));

    assert_eq!(reports.len(), 1);
    assert!(reports[0].is_clean());
    assert_eq!(reports[0].written.len(), 2);
    assert_eq!(
        fs::read_to_string(target.join("Data/Textures/hull.dds.1")).unwrap(),
        "mip"
    );
}
