//! Benchmarks for frame decoding and pose deduplication.
//!
//! Run with: cargo bench -p det-postprocess
//!
//! To compare against baseline:
//! 1. First run: cargo bench -p det-postprocess -- --save-baseline main
//! 2. After changes: cargo bench -p det-postprocess -- --baseline main

#![allow(
    missing_docs,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use det_postprocess::{
    DecodeConfig, Decoder, DecoderTables, PoseDedupConfig, PoseDeduplicator, RawDetections,
};
use det_types::{BoundingBox, ClassTable, Detection, Keypoint, KeypointMode, Keypoints};

// =============================================================================
// Test Frame Generation
// =============================================================================

/// A crowd of `n` people on a grid, every other one duplicated with jitter.
fn crowd(n: usize) -> Vec<Detection> {
    let cols = (n as f32).sqrt().ceil() as usize;
    let cell = 1.0 / cols as f32;

    (0..n)
        .map(|i| {
            let base = i / 2;
            let jitter = if i % 2 == 0 { 0.0 } else { cell * 0.02 };
            let x = (base % cols) as f32 * cell + jitter;
            let y = (base / cols) as f32 * cell;
            let pose = std::array::from_fn(|k| {
                let t = k as f32 / 16.0;
                Keypoint::new(x + cell * 0.5, y + cell * t, 0.9)
            });
            Detection::new(BoundingBox::new(x, y, x + cell, y + cell), 0, 0.5 + 0.4 / (i + 1) as f32)
                .with_keypoints(Keypoints::Pose(pose))
        })
        .collect()
}

fn raw_frame(n: usize) -> RawDetections {
    let dets = crowd(n);
    let boxes = dets.iter().map(|d| d.bbox.as_array()).collect();
    let confidences = dets.iter().map(|d| d.confidence).collect();
    let keypoints = dets
        .iter()
        .map(|d| {
            d.keypoints
                .as_ref()
                .and_then(Keypoints::pose)
                .map(|pose| pose.iter().map(|kp| [kp.x, kp.y]).collect())
                .unwrap_or_default()
        })
        .collect();
    RawDetections::new(boxes, vec![0; n], confidences).with_keypoints(keypoints, None)
}

// =============================================================================
// Pose Deduplication Benchmarks
// =============================================================================

fn bench_pose_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("PoseDedup");
    let dedup = PoseDeduplicator::new(
        PoseDedupConfig::new()
            .with_pose_nms(0.5)
            .with_pose_expand(0.3)
            .with_nms_iou(0.7),
    );

    for n in [16, 64, 256] {
        let dets = crowd(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("crowd", n), &dets, |b, dets| {
            b.iter(|| {
                let mut frame = dets.clone();
                dedup.dedup(black_box(&mut frame), 0);
                frame
            });
        });
    }

    group.finish();
}

// =============================================================================
// Decoder Benchmarks
// =============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("Decode");
    let config = DecodeConfig::new()
        .with_keypoint_mode(KeypointMode::FacePose)
        .with_pose(PoseDedupConfig::new().with_pose_nms(0.5));
    let Ok(decoder) = Decoder::new(DecoderTables::new(ClassTable::new(["person"])), config)
    else {
        return;
    };

    for n in [16, 128] {
        let raw = raw_frame(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("facepose", n), &raw, |b, raw| {
            b.iter(|| decoder.decode(black_box(raw)));
        });
    }

    group.finish();
}

// =============================================================================
// Criterion Setup
// =============================================================================

criterion_group!(benches, bench_pose_dedup, bench_decode);
criterion_main!(benches);
