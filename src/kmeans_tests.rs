use crate::errors::SimError;
use crate::kmeans::KMeansClusters;
use crate::samples;
use crate::scheduler;
use crate::simulation::{Scheduling, SimConfig, Simulation};

#[test]
fn test_partition_covers_every_particle_once() {
    let blobs = samples::clustered_blobs(200, 4, 13);
    let pool = scheduler::build_pool(2).unwrap();
    let clusters = KMeansClusters::compute(&blobs.pos_x, &blobs.pos_y, 5, &pool).unwrap();
    assert_eq!(clusters.len(), 5);

    let mut seen = vec![false; 200];
    for members in &clusters.members {
        for &i in members {
            assert!(!seen[i as usize], "particle {} assigned twice", i);
            seen[i as usize] = true;
        }
    }
    assert!(seen.iter().all(|&s| s));
}

#[test]
fn test_single_cluster_holds_everything() {
    let blobs = samples::clustered_blobs(50, 3, 19);
    let pool = scheduler::build_pool(1).unwrap();
    let clusters = KMeansClusters::compute(&blobs.pos_x, &blobs.pos_y, 1, &pool).unwrap();
    assert_eq!(clusters.members[0].len(), 50);

    let mean_x: f64 = blobs.pos_x.iter().sum::<f64>() / 50.0;
    assert!((clusters.centroid_x[0] - mean_x).abs() < 1e-12);
}

#[test]
fn test_cluster_count_above_particle_count_is_rejected() {
    let disk = samples::uniform_disk(10, 1.0, 29);
    let pool = scheduler::build_pool(1).unwrap();
    match KMeansClusters::compute(&disk.pos_x, &disk.pos_y, 11, &pool) {
        Err(SimError::ArgumentInvalid(_)) => {}
        other => panic!("expected ArgumentInvalid, got {:?}", other.map(|_| ())),
    }
    // k == N is the boundary and must work.
    assert!(KMeansClusters::compute(&disk.pos_x, &disk.pos_y, 10, &pool).is_ok());
}

#[test]
fn test_empty_clusters_reseed_from_particles() {
    // Every particle at the same spot: all labels collapse onto cluster 0
    // and the other centroids fall back to particle positions.
    let pos_x = vec![0.5; 6];
    let pos_y = vec![-0.5; 6];
    let pool = scheduler::build_pool(1).unwrap();
    let clusters = KMeansClusters::compute(&pos_x, &pos_y, 3, &pool).unwrap();
    assert_eq!(clusters.members[0].len(), 6);
    assert!(clusters.members[1].is_empty());
    assert!(clusters.members[2].is_empty());
    for i in 0..3 {
        assert_eq!(clusters.centroid_x[i], 0.5);
        assert_eq!(clusters.centroid_y[i], -0.5);
    }
}

#[test]
fn test_clustered_schedule_matches_chunked_schedule_bitwise() {
    let blobs = samples::clustered_blobs(600, 6, 37);

    let mut chunked = Simulation::new(
        blobs.clone(),
        SimConfig {
            n_threads: 2,
            ..SimConfig::default()
        },
    )
    .unwrap();
    let mut clustered = Simulation::new(
        blobs,
        SimConfig {
            n_threads: 2,
            scheduling: Scheduling::KMeans { k: 12 },
            ..SimConfig::default()
        },
    )
    .unwrap();

    chunked.compute_forces().unwrap();
    clustered.compute_forces().unwrap();

    let (ax, ay) = chunked.forces();
    let (bx, by) = clustered.forces();
    assert_eq!(ax, bx);
    assert_eq!(ay, by);
}
