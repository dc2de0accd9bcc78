use marker_features::config::{Delimiter, DescriberType, ImportConfig};
use marker_features::descriptor_writer::{DescriptorWriter, INDICATOR_LEN, INDICATOR_ON};
use marker_features::marker_table::MarkerTable;
use marker_features::observer::RecordingObserver;
use marker_features::pipeline::{ImportPaths, run};
use marker_features::view_catalog::ViewCatalog;
use marker_features::MarkerError;
use std::fs;
use tempfile::TempDir;

const TABLE: &str = "10,20,a.jpg,3,5\n\
                     11,21,b.jpg,3,6\n\
                     12,22,a.jpg,7,5\n\
                     13,23,b.jpg,4,6\n\
                     14,24,ghost.jpg,9,6\n";

fn table() -> MarkerTable {
    MarkerTable::from_reader(TABLE.as_bytes(), Delimiter::Comma).unwrap()
}

fn catalog() -> ViewCatalog {
    ViewCatalog::from_views([("a.jpg", 100), ("b.jpg", 200), ("c.jpg", 300)])
}

fn read_count(bytes: &[u8]) -> u64 {
    u64::from_le_bytes(bytes[..8].try_into().unwrap())
}

#[test]
fn test_every_view_gets_a_file_pair() {
    let dir = TempDir::new().unwrap();
    let writer = DescriptorWriter::new(dir.path(), &ImportConfig::default());
    let observer = RecordingObserver::new();
    let output = writer.write_all(&catalog(), &table(), &observer).unwrap();

    let feat_a = fs::read_to_string(dir.path().join("100.cctag3.feat")).unwrap();
    assert_eq!(feat_a, "10 20 5 0\n12 22 5 0\n");
    let desc_a = fs::read(dir.path().join("100.cctag3.desc")).unwrap();
    assert_eq!(desc_a.len(), 8 + INDICATOR_LEN);
    assert_eq!(read_count(&desc_a), 2);
    assert_eq!(desc_a[8 + 7], INDICATOR_ON);
    assert_eq!(desc_a[8 + 3], 0);

    // view without markers
    let feat_c = fs::read(dir.path().join("300.cctag3.feat")).unwrap();
    assert!(feat_c.is_empty());
    let desc_c = fs::read(dir.path().join("300.cctag3.desc")).unwrap();
    assert_eq!(desc_c, vec![0u8; 8]);

    assert_eq!(output.feature_index.len(), 3);
    assert_eq!(output.feature_index[&100][&3], 0);
    assert_eq!(output.feature_index[&100][&7], 1);
    assert_eq!(output.feature_index[&200][&4], 1);
    assert!(output.feature_index[&300].is_empty());

    assert_eq!(output.marker_presence[&3], 2);
    assert_eq!(output.marker_presence[&7], 1);
    assert_eq!(output.marker_presence[&9], 0);

    assert_eq!(
        observer.progress_calls(),
        vec![(0, 3), (1, 3), (2, 3), (3, 3)]
    );
    let info = observer.messages_at(log::Level::Info);
    assert_eq!(info[0], "Writing cctag3 descriptor files");
    assert!(info.contains(&"\tFound marker 3 in 2 view(s)".to_string()));
    assert_eq!(
        observer.messages_at(log::Level::Debug),
        vec![
            "view 100 (a.jpg): 2 marker(s)".to_string(),
            "view 200 (b.jpg): 2 marker(s)".to_string(),
            "view 300 (c.jpg): 0 marker(s)".to_string(),
        ]
    );
}

#[test]
fn test_bypass_writes_count_only() {
    let dir = TempDir::new().unwrap();
    let config = ImportConfig {
        bypass_limit: true,
        describer_type: DescriberType::Cctag4,
        ..Default::default()
    };
    DescriptorWriter::new(dir.path(), &config)
        .write_all(&catalog(), &table(), &RecordingObserver::new())
        .unwrap();
    let desc = fs::read(dir.path().join("200.cctag4.desc")).unwrap();
    assert_eq!(desc.len(), 8);
    assert_eq!(read_count(&desc), 2);
}

#[test]
fn test_duplicate_marker_maps_to_last_row() {
    let dir = TempDir::new().unwrap();
    let table =
        MarkerTable::from_reader("1,1,a.jpg,5,2\n2,2,a.jpg,5,2\n".as_bytes(), Delimiter::Comma)
            .unwrap();
    let catalog = ViewCatalog::from_views([("a.jpg", 1)]);
    let output = DescriptorWriter::new(dir.path(), &ImportConfig::default())
        .write_all(&catalog, &table, &RecordingObserver::new())
        .unwrap();
    assert_eq!(output.feature_index[&1][&5], 1);
    assert_eq!(output.marker_presence[&5], 1);
    let desc = fs::read(dir.path().join("1.cctag3.desc")).unwrap();
    assert_eq!(desc.iter().skip(8).filter(|&&b| b == INDICATOR_ON).count(), 1);
}

#[test]
fn test_out_of_range_keeps_earlier_views() {
    let dir = TempDir::new().unwrap();
    let table = MarkerTable::from_reader(
        "1,1,a.jpg,127,2\n1,1,b.jpg,128,2\n".as_bytes(),
        Delimiter::Comma,
    )
    .unwrap();
    let catalog = ViewCatalog::from_views([("a.jpg", 1), ("b.jpg", 2)]);
    let err = DescriptorWriter::new(dir.path(), &ImportConfig::default())
        .write_all(&catalog, &table, &RecordingObserver::new())
        .unwrap_err();
    assert!(matches!(
        err,
        MarkerError::MarkerIdOutOfRange {
            marker_id: 128,
            view_id: 2
        }
    ));
    assert!(dir.path().join("1.cctag3.desc").exists());
    assert!(!dir.path().join("2.cctag3.desc").exists());
}

#[test]
fn test_parallel_matches_sequential() {
    let seq_dir = TempDir::new().unwrap();
    let par_dir = TempDir::new().unwrap();
    let seq = DescriptorWriter::new(seq_dir.path(), &ImportConfig::default())
        .write_all(&catalog(), &table(), &RecordingObserver::new())
        .unwrap();
    let config = ImportConfig {
        parallel: true,
        ..Default::default()
    };
    let observer = RecordingObserver::new();
    let par = DescriptorWriter::new(par_dir.path(), &config)
        .write_all(&catalog(), &table(), &observer)
        .unwrap();

    assert_eq!(seq.feature_index, par.feature_index);
    assert_eq!(seq.marker_presence, par.marker_presence);
    assert_eq!(observer.progress_calls().len(), 4);
    for view_id in [100, 200, 300] {
        for ext in ["feat", "desc"] {
            let name = format!("{}.cctag3.{}", view_id, ext);
            assert_eq!(
                fs::read(seq_dir.path().join(&name)).unwrap(),
                fs::read(par_dir.path().join(&name)).unwrap()
            );
        }
    }
}

#[test]
fn test_parallel_progress_never_steps_back() {
    let dir = TempDir::new().unwrap();
    let views: Vec<(String, u64)> = (0..64).map(|i| (format!("{}.jpg", i), i)).collect();
    let config = ImportConfig {
        parallel: true,
        ..Default::default()
    };
    let observer = RecordingObserver::new();
    DescriptorWriter::new(dir.path(), &config)
        .write_all(&ViewCatalog::from_views(views), &table(), &observer)
        .unwrap();
    let expected: Vec<(usize, usize)> = (0..=64).map(|n| (n, 64)).collect();
    assert_eq!(observer.progress_calls(), expected);
    assert_eq!(observer.messages_at(log::Level::Debug).len(), 64);
}

#[test]
fn test_parallel_out_of_range_reports_middle_view() {
    let table = "1,1,a.jpg,3,2\n\
                 2,2,b.jpg,128,2\n\
                 3,3,c.jpg,129,2\n";
    let config = ImportConfig {
        parallel: true,
        ..Default::default()
    };

    let dir = TempDir::new().unwrap();
    let err = DescriptorWriter::new(dir.path(), &config)
        .write_all(
            &catalog(),
            &MarkerTable::from_reader(table.as_bytes(), Delimiter::Comma).unwrap(),
            &RecordingObserver::new(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        MarkerError::MarkerIdOutOfRange {
            marker_id: 128,
            view_id: 200
        }
    ));

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("markers.csv"), table).unwrap();
    fs::write(
        dir.path().join("cameraInit.sfm"),
        r#"{"views": [
            {"viewId": "100", "path": "/p/a.jpg"},
            {"viewId": "200", "path": "/p/b.jpg"},
            {"viewId": "300", "path": "/p/c.jpg"}
        ]}"#,
    )
    .unwrap();
    let paths = ImportPaths::new(
        dir.path().join("cameraInit.sfm"),
        dir.path().join("markers.csv"),
        dir.path().join("out"),
    );
    let observer = RecordingObserver::new();
    let err = run(&paths, &config, &observer).unwrap_err();
    assert!(matches!(
        err,
        MarkerError::MarkerIdOutOfRange { view_id: 200, .. }
    ));
    assert_eq!(observer.finish_count(), 1);
    assert_eq!(observer.messages_at(log::Level::Error).len(), 1);
    assert!(!observer
        .messages_at(log::Level::Info)
        .contains(&"Task done".to_string()));
}
