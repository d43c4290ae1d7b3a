use std::sync::Arc;

use glam::{IVec2, Vec2};

use crate::film::block::ImageBlock;
use crate::film::filter::{BoxFilter, GaussianFilter, ReconstructionFilter};

#[test]
fn test_border_follows_filter_radius() {
    let filter: Arc<dyn ReconstructionFilter> = Arc::new(GaussianFilter::default());
    let block = ImageBlock::new(IVec2::new(16, 32), IVec2::new(8, 8), 4, Some(filter));

    assert_eq!(block.border(), 2);
    let fp = block.footprint();
    assert_eq!(fp.min, IVec2::new(14, 30));
    assert_eq!(fp.max, IVec2::new(26, 42));
    assert_eq!(block.data().len(), 12 * 12 * 4);
}

#[test]
fn test_unfiltered_sample_lands_in_one_pixel() {
    let mut block = ImageBlock::new(IVec2::ZERO, IVec2::new(4, 4), 2, None);
    assert!(block.put_sample(Vec2::new(2.3, 1.7), &[3.0, 1.0]));

    assert_eq!(block.pixel(IVec2::new(2, 1)), Some(&[3.0, 1.0][..]));
    let total: f32 = block.data().iter().sum();
    assert_eq!(total, 4.0);
}

#[test]
fn test_filtered_sample_normalizes_back_to_its_value() {
    let filter: Arc<dyn ReconstructionFilter> = Arc::new(GaussianFilter::default());
    let mut block = ImageBlock::new(IVec2::ZERO, IVec2::new(8, 8), 2, Some(filter));
    block.put_sample(Vec2::new(4.2, 3.9), &[6.0, 1.0]);

    let mut touched = 0;
    for y in -2..10 {
        for x in -2..10 {
            let px = block.pixel(IVec2::new(x, y)).unwrap();
            if px[1] > 0.0 {
                touched += 1;
                assert!((px[0] / px[1] - 6.0).abs() < 1e-4);
            }
        }
    }
    assert!(touched > 1);
}

#[test]
fn test_samples_are_clipped_to_footprint() {
    let filter: Arc<dyn ReconstructionFilter> = Arc::new(BoxFilter::new(1.5));
    let mut block = ImageBlock::new(IVec2::new(4, 4), IVec2::new(2, 2), 2, Some(filter));
    // Sample far outside the footprint contributes nothing.
    block.put_sample(Vec2::new(40.0, 40.0), &[1.0, 1.0]);
    assert!(block.data().iter().all(|&v| v == 0.0));
}

#[test]
fn test_non_finite_samples_are_rejected() {
    let mut block = ImageBlock::new(IVec2::ZERO, IVec2::new(2, 2), 2, None);
    assert!(!block.put_sample(Vec2::new(0.5, 0.5), &[f32::NAN, 1.0]));
    assert!(!block.put_sample(Vec2::new(0.5, 0.5), &[f32::INFINITY, 1.0]));
    assert!(block.data().iter().all(|&v| v == 0.0));
}

#[test]
fn test_clear_and_reuse() {
    let mut block = ImageBlock::new(IVec2::ZERO, IVec2::new(2, 2), 2, None);
    block.add_pixel(IVec2::new(1, 1), &[2.0, 1.0]);
    block.clear();
    block.set_offset(IVec2::new(10, 10));

    assert!(block.data().iter().all(|&v| v == 0.0));
    assert!(block.pixel(IVec2::new(1, 1)).is_none());
    assert!(block.pixel(IVec2::new(11, 11)).is_some());
}

#[test]
#[should_panic(expected = "channel count mismatch")]
fn test_add_pixel_rejects_wrong_channel_count() {
    let mut block = ImageBlock::new(IVec2::ZERO, IVec2::new(2, 2), 3, None);
    block.add_pixel(IVec2::ZERO, &[1.0, 1.0]);
}
