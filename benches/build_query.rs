//! Build/query benchmark on synthetic data.
//!
//! Builds an index over uniform random points in the unit square, then
//! measures query throughput and recall@10 against brute force.
//!
//! Usage: cargo bench --bench build_query

use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallworld::{HnswIndex, HnswParams, NodeId};
use std::time::Instant;

const N: usize = 10_000;
const QUERIES: usize = 500;
const K: usize = 10;

type Point = [f64; 2];

fn euclidean(a: &Point, b: &Point) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

fn brute_force_ids(points: &[Point], query: &Point, k: usize) -> Vec<NodeId> {
    let mut ranked: Vec<(f64, NodeId)> = points
        .iter()
        .enumerate()
        .map(|(id, p)| (euclidean(query, p), id as NodeId))
        .collect();
    ranked.sort_by_key(|&(d, id)| (OrderedFloat(d), id));
    ranked.into_iter().take(k).map(|(_, id)| id).collect()
}

fn main() {
    let mut rng = StdRng::seed_from_u64(42);
    let points: Vec<Point> = (0..N)
        .map(|_| [rng.gen::<f64>(), rng.gen::<f64>()])
        .collect();
    let queries: Vec<Point> = (0..QUERIES)
        .map(|_| [rng.gen::<f64>(), rng.gen::<f64>()])
        .collect();

    println!("=== smallworld bench: {N} uniform points, k={K} ===");
    println!();

    let mut index: HnswIndex<Point, fn(&Point, &Point) -> f64> = HnswIndex::new(euclidean);
    let params = HnswParams::default();
    let mut build_rng = StdRng::seed_from_u64(1);

    let start = Instant::now();
    index
        .build(points.clone(), &mut build_rng, params)
        .expect("build succeeds");
    let build_time = start.elapsed();
    println!(
        "build: {:.2}s ({:.0} inserts/s), top layer {}",
        build_time.as_secs_f64(),
        N as f64 / build_time.as_secs_f64(),
        index.graph().expect("built").max_layer()
    );

    let start = Instant::now();
    let mut results = Vec::with_capacity(QUERIES);
    for query in &queries {
        results.push(index.knn_search(query, K).expect("query succeeds"));
    }
    let query_time = start.elapsed();
    println!(
        "query: {:.1} qps ({:.3} ms/query)",
        QUERIES as f64 / query_time.as_secs_f64(),
        query_time.as_secs_f64() * 1000.0 / QUERIES as f64
    );

    let mut found = 0usize;
    for (query, hits) in queries.iter().zip(&results) {
        let truth = brute_force_ids(&points, query, K);
        let hit_ids: Vec<NodeId> = hits.iter().map(|h| h.id).collect();
        found += truth.iter().filter(|id| hit_ids.contains(id)).count();
    }
    let recall = found as f64 / (QUERIES * K) as f64;
    println!("recall@{K}: {recall:.4}");
}
