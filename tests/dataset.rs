use ndarray::{array, Array2};
use s2p_reader::rng::SimpleRng;
use s2p_reader::sample::{synthetic_plane, write_dataset, SamplePlane};
use s2p_reader::{DatasetConfig, PlaneDataset, S2pError, Selector};

fn open_seeded(root: &std::path::Path) -> PlaneDataset {
    let config = DatasetConfig {
        shuffle_seed: Some(7),
        ..DatasetConfig::default()
    };
    PlaneDataset::with_config(root, config).unwrap()
}

#[test]
fn browse_a_synthetic_recording() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = SimpleRng::new(99);
    let planes: Vec<SamplePlane> = (0..3)
        .map(|_| synthetic_plane(&mut rng, 12, 80, (32, 32)))
        .collect();
    write_dataset(dir.path(), &planes).unwrap();

    let mut ds = open_seeded(dir.path());
    assert_eq!(ds.plane_count(), 3);

    for (p, plane) in planes.iter().enumerate() {
        ds.set_current_plane(p).unwrap();
        ds.select(Selector::IsCell).unwrap();

        let expected: Vec<usize> = plane
            .iscell
            .outer_iter()
            .enumerate()
            .filter(|(_, row)| row[0] == 1.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(ds.selected_neurons().unwrap(), expected.as_slice());

        let f = ds.fluorescence().unwrap();
        assert_eq!(f.dim(), (expected.len(), 80));
        for (row, &roi) in f.outer_iter().zip(&expected) {
            assert_eq!(row, plane.fluorescence.row(roi));
        }

        let x = ds.x().unwrap();
        let y = ds.y().unwrap();
        for (i, &roi) in expected.iter().enumerate() {
            assert_eq!(y[i], plane.med[roi][0] as i64);
            assert_eq!(x[i], plane.med[roi][1] as i64);
        }
    }
}

#[test]
fn shuffled_spikes_keep_each_rows_values() {
    let dir = tempfile::tempdir().unwrap();
    let plane = SamplePlane {
        mean_image: array![[0.0]],
        aspect: 1.0,
        med: vec![[0.0, 0.0], [1.0, 1.0]],
        iscell: array![[1.0, 0.8], [1.0, 0.7]],
        fluorescence: Array2::zeros((2, 8)),
        spikes: array![
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]
        ],
    };
    write_dataset(dir.path(), &[plane.clone()]).unwrap();

    let mut ds = open_seeded(dir.path());
    ds.set_shuffle_traces(true);
    assert!(ds.shuffle_traces());
    let shuffled = ds.spikes().unwrap();
    for (got, want) in shuffled.outer_iter().zip(plane.spikes.outer_iter()) {
        let mut got = got.to_vec();
        got.sort_by(f32::total_cmp);
        assert_eq!(got, want.to_vec());
    }

    ds.set_shuffle_traces(false);
    assert_eq!(ds.spikes().unwrap(), plane.spikes);
}

#[test]
fn custom_file_names_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = SimpleRng::new(5);
    write_dataset(dir.path(), &[synthetic_plane(&mut rng, 4, 10, (8, 8))]).unwrap();
    std::fs::rename(dir.path().join("suite2p"), dir.path().join("s2p_out")).unwrap();

    assert!(matches!(
        PlaneDataset::open(dir.path()),
        Err(S2pError::NotFound { .. })
    ));

    let cfg_path = dir.path().join("reader.json");
    std::fs::write(&cfg_path, r#"{ "subfolder": "s2p_out" }"#).unwrap();
    let config = DatasetConfig::from_json_file(&cfg_path).unwrap();
    let ds = PlaneDataset::with_config(dir.path(), config).unwrap();
    assert_eq!(ds.plane_count(), 1);
    assert_eq!(ds.roi_count_total().unwrap(), 4);
}
