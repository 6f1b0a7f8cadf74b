//! Image acquisition tests: picking from files and directories, cropping.

use std::time::{Duration, SystemTime};

use snapped::acquire::{Acquisition, AcquisitionFlow, PathSource, newest_image};
use snapped::error::ErrorKind;
use snapped::image_ops::{CropRegion, FixedRegion, FullImage};
use snapped::state::{ExitReason, FlowState, FlowTracker};

use crate::common::fixtures::{TestImages, set_mtime};

// ===== Picking =====

#[test]
fn test_newest_image_ignores_non_images() {
    let images = TestImages::screenshots(2, 16, 16);
    let notes = images.file("notes.txt");
    std::fs::write(&notes, "not an image").unwrap();
    set_mtime(
        &notes,
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_900_000_000),
    );

    let picked = newest_image(images.path()).unwrap().unwrap();
    assert!(picked.ends_with("shot-1.png"));
}

#[test]
fn test_newest_image_follows_mtime_not_name() {
    let images = TestImages::screenshots(3, 16, 16);
    set_mtime(
        &images.file("shot-0.png"),
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_800_000_000),
    );

    let picked = newest_image(images.path()).unwrap().unwrap();
    assert!(picked.ends_with("shot-0.png"));
}

#[test]
fn test_empty_directory_cancels() {
    let images = TestImages::empty();
    let work = TestImages::empty();
    let mut tracker = FlowTracker::new();

    let source = PathSource::new(images.path());
    let outcome = AcquisitionFlow::new(&source, &FullImage, work.path())
        .acquire(&mut tracker)
        .unwrap();

    assert_eq!(outcome, Acquisition::Cancelled);
    assert_eq!(
        tracker.current(),
        &FlowState::Exited {
            reason: ExitReason::Cancelled
        }
    );
    assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
}

// ===== Cropping =====

#[test]
fn test_fixed_region_crop_written_as_jpeg() {
    let images = TestImages::single("photo.png", 300, 200);
    let work = TestImages::empty();
    let mut tracker = FlowTracker::new();

    let source = PathSource::new(images.file("photo.png"));
    let strategy = FixedRegion(CropRegion::new(100, 50, 80, 60));
    let outcome = AcquisitionFlow::new(&source, &strategy, work.path())
        .with_jpeg_quality(70)
        .acquire(&mut tracker)
        .unwrap();

    let Acquisition::Ready(acquired) = outcome else {
        panic!("Expected a ready image, got {outcome:?}");
    };
    let path = acquired.image.to_path();
    assert!(path.starts_with(work.path()));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));

    let cropped = image::open(&path).unwrap();
    assert_eq!((cropped.width(), cropped.height()), (80, 60));
    assert!(matches!(tracker.current(), FlowState::Cropping { .. }));
}

#[test]
fn test_region_outside_image_fails_flow() {
    let images = TestImages::single("small.png", 50, 50);
    let work = TestImages::empty();
    let mut tracker = FlowTracker::new();

    let source = PathSource::new(images.file("small.png"));
    let strategy = FixedRegion(CropRegion::new(60, 60, 10, 10));
    let err = AcquisitionFlow::new(&source, &strategy, work.path())
        .acquire(&mut tracker)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Image);
    assert!(matches!(
        tracker.current(),
        FlowState::Failed {
            kind: ErrorKind::Image,
            ..
        }
    ));
}

#[test]
fn test_unsupported_file_is_rejected() {
    let images = TestImages::empty();
    let doc = images.file("report.pdf");
    std::fs::write(&doc, b"%PDF-1.4").unwrap();
    let work = TestImages::empty();
    let mut tracker = FlowTracker::new();

    let source = PathSource::new(&doc);
    let err = AcquisitionFlow::new(&source, &FullImage, work.path())
        .acquire(&mut tracker)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Image);
}
