use std::path::{Path, PathBuf};

use myna_files::{FileError, FileKind};

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn gv_headers_are_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "gv.csv",
        "X (m),Y (m),G (K/m),V (m/s),extra\n0,0,1e6,0.1,7\n",
    );
    assert!(FileKind::Gv.is_valid(&path));
}

#[test]
fn missing_columns_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "gv.csv", "x (m),y (m),g (k/m)\n0,0,1\n");
    match FileKind::Gv.validate(&path).unwrap_err() {
        FileError::MissingColumns { missing, .. } => assert_eq!(missing, vec!["v (m/s)"]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!FileKind::Gv.is_valid(&path));
}

#[test]
fn extension_must_match() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "ids.txt", "x (m),y (m),id\n0,0,1\n");
    assert!(matches!(
        FileKind::Id.validate(&path),
        Err(FileError::WrongExtension { expected: ".csv", .. })
    ));
}

#[test]
fn vtk_checks_extension_only() {
    let dir = tempfile::tempdir().unwrap();
    let good = write(dir.path(), "grains.vtk", "anything");
    let bad = write(dir.path(), "grains.csv", "anything");
    assert!(FileKind::Vtk.is_valid(&good));
    assert!(!FileKind::Vtk.is_valid(&bad));
}

#[test]
fn missing_file_is_invalid() {
    assert!(!FileKind::Region.is_valid(Path::new("/nonexistent/region.csv")));
}

#[test]
fn gv_sync_keeps_top_surface_and_derives_cooling_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "gv.csv",
        concat!(
            "x (m),y (m),z (m),g (k/m),v (m/s)\n",
            "0.0,0.0,0.001,100,0.5\n",
            "1.0,0.0,0.002,200,0.25\n",
            "2.0,0.0,0.002,400,0.5\n",
        ),
    );
    let fields = FileKind::Gv.values_for_sync(&path).unwrap();
    assert_eq!(fields.x, vec![1.0, 2.0]);
    assert_eq!(fields.field("G").unwrap().values, vec![200.0, 400.0]);
    assert_eq!(fields.field("R").unwrap().unit, "m/s");
    assert_eq!(fields.field("cooling_rate").unwrap().values, vec![50.0, 200.0]);
}

#[test]
fn reduced_solidification_sync_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "reduced.csv",
        "x,y,z,tm,ts,cr\n0,0,0,1.0,2.0,3.0\n0,1,1,4.0,5.0,6.0\n",
    );
    let fields = FileKind::ReducedSolidification.values_for_sync(&path).unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields.field("t_melt").unwrap().values, vec![4.0]);
    assert_eq!(fields.field("t_solidify").unwrap().values, vec![5.0]);
    assert_eq!(fields.field("cooling_rate").unwrap().values, vec![6.0]);
}

#[test]
fn melt_pool_sync_drops_incomplete_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "mp.csv",
        concat!(
            "Time (s),x (m),y (m),Length (m),Width (m),Depth (m)\n",
            "0.1,0,0,1e-4,5e-5,2e-5\n",
            "0.2,1,0,,5e-5,2e-5\n",
        ),
    );
    let fields = FileKind::MeltPoolGeometry.values_for_sync(&path).unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields.field("myna_time").unwrap().values, vec![0.1]);
}

#[test]
fn region_files_cannot_be_synced() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "region.csv",
        "id,x (m),y (m),layer_starts,layer_ends,part\n1,0,0,1,5,P1\n",
    );
    assert!(FileKind::Region.is_valid(&path));
    assert!(!FileKind::Region.can_sync());
    assert!(matches!(
        FileKind::Region.values_for_sync(&path),
        Err(FileError::SyncUnsupported { kind: "FileRegion" })
    ));
}

#[test]
fn names_round_trip() {
    for kind in FileKind::ALL {
        assert_eq!(FileKind::from_name(kind.name()), Some(kind));
    }
}
