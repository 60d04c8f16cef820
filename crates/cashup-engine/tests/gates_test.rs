use cashup_engine::{
    EngineConfig, FestivalSpec, MemoryPhotoStore, NullClassifier, RewardEngine,
};
use cashup_ledger::{MemoryStorage, RewardStorage};
use cashup_phash::PerceptualHash;
use cashup_types::{
    Festival, Geofence, PhotoId, PhotoStatus, PointAmount, RewardError, TrashPhoto, User, UserId,
};
use chrono::Utc;
use std::sync::Arc;

const SEOUL: (f64, f64) = (37.5665, 126.9780);

struct Rig {
    storage: Arc<MemoryStorage>,
    photos: Arc<MemoryPhotoStore>,
    engine: Arc<RewardEngine>,
}

fn rig(config: EngineConfig) -> Rig {
    let storage = Arc::new(MemoryStorage::new());
    let photos = Arc::new(MemoryPhotoStore::new());
    let engine = Arc::new(RewardEngine::new(
        storage.clone(),
        photos.clone(),
        Arc::new(NullClassifier),
        config,
    ));
    Rig {
        storage,
        photos,
        engine,
    }
}

fn png(pattern: fn(u32, u32) -> bool) -> Vec<u8> {
    let img = image::RgbImage::from_fn(32, 32, |x, y| {
        if pattern(x, y) {
            image::Rgb([255, 255, 255])
        } else {
            image::Rgb([0, 0, 0])
        }
    });
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

async fn festival_with(
    engine: &RewardEngine,
    budget: u64,
    cap: u64,
    geofence: Option<Geofence>,
) -> (Festival, User) {
    let festival = engine
        .create_festival(FestivalSpec {
            name: "Harbor Days".to_string(),
            budget: PointAmount::new(budget),
            per_user_daily_cap: PointAmount::new(cap),
            per_photo_point: PointAmount::new(100),
            geofence,
        })
        .await
        .unwrap();
    let user = engine.register_user("Alice").await.unwrap();
    (festival, user)
}

#[tokio::test]
async fn test_geofence_rejects_far_and_missing_locations() {
    let Rig { engine, .. } = rig(EngineConfig::default());
    let fence = Geofence {
        center_lat: SEOUL.0,
        center_lng: SEOUL.1,
        radius_meters: Some(100.0),
    };
    let (festival, alice) = festival_with(&engine, 10_000, 500, Some(fence)).await;
    let fid = Some(festival.id.clone());
    let image = png(|x, _| x < 16);

    // Roughly 1.1 km north of the fence center.
    let err = engine
        .submit_photo(&alice.id, &alice.id, fid.clone(), &image, Some(37.5765), Some(SEOUL.1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "outside_geofence");

    // A fenced festival refuses submissions without coordinates.
    let err = engine
        .submit_photo(&alice.id, &alice.id, fid.clone(), &image, None, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "outside_geofence");

    engine
        .submit_photo(&alice.id, &alice.id, fid, &image, Some(SEOUL.0), Some(SEOUL.1))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_fifth_submission_in_window_is_rate_limited() {
    let config = EngineConfig {
        dedup_window: 0,
        ..EngineConfig::default()
    };
    let Rig { engine, .. } = rig(config);
    let (festival, alice) = festival_with(&engine, 10_000, 1_000, None).await;
    let fid = Some(festival.id.clone());
    let image = png(|x, _| x < 16);

    for _ in 0..4 {
        engine
            .submit_photo(&alice.id, &alice.id, fid.clone(), &image, None, None)
            .await
            .unwrap();
    }

    let err = engine
        .submit_photo(&alice.id, &alice.id, fid, &image, None, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "rate_limited");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_identical_resubmission_is_rejected_and_cleaned_up() {
    let Rig { photos, engine, .. } = rig(EngineConfig::default());
    let (festival, alice) = festival_with(&engine, 10_000, 500, None).await;
    let fid = Some(festival.id.clone());
    let image = png(|x, _| x < 16);

    engine
        .submit_photo(&alice.id, &alice.id, fid.clone(), &image, None, None)
        .await
        .unwrap();
    assert_eq!(photos.len().await, 1);

    let err = engine
        .submit_photo(&alice.id, &alice.id, fid, &image, None, None)
        .await
        .unwrap_err();
    match err {
        RewardError::DuplicateImage { distance, .. } => assert_eq!(distance, 0),
        other => panic!("expected duplicate image, got {}", other),
    }
    // The rejected upload's bytes were removed from the photo store.
    assert_eq!(photos.len().await, 1);
}

async fn seed_stored_hash(storage: &MemoryStorage, user: &UserId, festival: &Festival, hash: String) {
    storage
        .insert_photo(TrashPhoto {
            id: PhotoId::new("seeded"),
            user_id: user.clone(),
            festival_id: festival.id.clone(),
            storage_ref: "mem://photos/seeded".to_string(),
            hash,
            status: PhotoStatus::Pending,
            points: PointAmount::ZERO,
            detection: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_dedup_threshold_boundary() {
    let image = png(|x, _| x < 16);
    let submitted = PerceptualHash::compute(&image).unwrap();

    // Distance exactly 5 from the incoming hash: rejected.
    let Rig {
        storage, engine, ..
    } = rig(EngineConfig::default());
    let (festival, alice) = festival_with(&engine, 10_000, 500, None).await;
    let near = PerceptualHash::from_bits(submitted.bits() ^ 0x1F).to_hex();
    seed_stored_hash(&storage, &alice.id, &festival, near).await;

    let err = engine
        .submit_photo(&alice.id, &alice.id, Some(festival.id.clone()), &image, None, None)
        .await
        .unwrap_err();
    match err {
        RewardError::DuplicateImage { distance, .. } => assert_eq!(distance, 5),
        other => panic!("expected duplicate image, got {}", other),
    }

    // Distance 6: just different enough to pass.
    let Rig {
        storage, engine, ..
    } = rig(EngineConfig::default());
    let (festival, alice) = festival_with(&engine, 10_000, 500, None).await;
    let far = PerceptualHash::from_bits(submitted.bits() ^ 0x3F).to_hex();
    seed_stored_hash(&storage, &alice.id, &festival, far).await;

    engine
        .submit_photo(&alice.id, &alice.id, Some(festival.id.clone()), &image, None, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_daily_cap_blocks_submission() {
    let config = EngineConfig {
        dedup_window: 0,
        ..EngineConfig::default()
    };
    let Rig { engine, .. } = rig(config);
    let (festival, alice) = festival_with(&engine, 10_000, 250, None).await;
    let fid = Some(festival.id.clone());
    let image = png(|x, _| x < 16);

    engine
        .submit_photo(&alice.id, &alice.id, fid.clone(), &image, None, None)
        .await
        .unwrap();
    engine
        .submit_photo(&alice.id, &alice.id, fid.clone(), &image, None, None)
        .await
        .unwrap();

    // A third 100-point photo would put the day at 300 of 250.
    let err = engine
        .submit_photo(&alice.id, &alice.id, fid, &image, None, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "cap_exceeded");
}

#[tokio::test]
async fn test_budget_exhaustion_blocks_submission() {
    let config = EngineConfig {
        dedup_window: 0,
        ..EngineConfig::default()
    };
    let Rig { engine, .. } = rig(config);
    let (festival, alice) = festival_with(&engine, 250, 10_000, None).await;
    let bob = engine.register_user("Bob").await.unwrap();
    let fid = Some(festival.id.clone());
    let image = png(|x, _| x < 16);

    engine
        .submit_photo(&alice.id, &alice.id, fid.clone(), &image, None, None)
        .await
        .unwrap();
    engine
        .submit_photo(&bob.id, &bob.id, fid.clone(), &image, None, None)
        .await
        .unwrap();

    // 200 of 250 granted; another 100 does not fit, for any user.
    let err = engine
        .submit_photo(&alice.id, &alice.id, fid, &image, None, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "budget_exhausted");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_coupon_debits_consume_the_shared_budget() {
    let config = EngineConfig {
        dedup_window: 0,
        ..EngineConfig::default()
    };
    let Rig { engine, .. } = rig(config);
    let (festival, alice) = festival_with(&engine, 400, 10_000, None).await;
    let fid = Some(festival.id.clone());
    engine.generate_bins(fid.clone(), 1).await.unwrap();
    let image = png(|x, _| x < 16);

    engine
        .submit_photo(&alice.id, &alice.id, fid.clone(), &image, None, None)
        .await
        .unwrap();
    engine
        .submit_photo(&alice.id, &alice.id, fid.clone(), &image, None, None)
        .await
        .unwrap();
    engine
        .activate_by_bin_scan(&alice.id, &alice.id, fid.clone(), "1", None, None)
        .await
        .unwrap();
    engine
        .issue_coupon(&alice.id, &alice.id, fid.clone(), "Harbor Grill", PointAmount::new(150))
        .await
        .unwrap();

    // 200 in photo points plus 150 in coupon value leaves only 50.
    let err = engine
        .submit_photo(&alice.id, &alice.id, fid, &image, None, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "budget_exhausted");
}

#[tokio::test]
async fn test_concurrent_submissions_grant_budget_exactly_once() {
    let config = EngineConfig {
        dedup_window: 0,
        ..EngineConfig::default()
    };
    let Rig { engine, .. } = rig(config);
    let (festival, alice) = festival_with(&engine, 100, 10_000, None).await;
    let bob = engine.register_user("Bob").await.unwrap();

    let mut handles = Vec::new();
    for user in [alice.id.clone(), bob.id.clone()] {
        let engine = engine.clone();
        let festival_id = festival.id.clone();
        handles.push(tokio::spawn(async move {
            let image = png(|x, _| x < 16);
            engine
                .submit_photo(&user, &user, Some(festival_id), &image, None, None)
                .await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(e) => assert_eq!(e.kind(), "budget_exhausted"),
        }
    }
    assert_eq!(accepted, 1);

    let overview = engine
        .festival_overview(Some(festival.id.clone()))
        .await
        .unwrap();
    assert_eq!(overview.used_budget, PointAmount::new(100));
}

#[tokio::test]
async fn test_garbage_bytes_are_rejected_and_never_retained() {
    let Rig { photos, engine, .. } = rig(EngineConfig::default());
    let (festival, alice) = festival_with(&engine, 10_000, 500, None).await;

    let err = engine
        .submit_photo(
            &alice.id,
            &alice.id,
            Some(festival.id.clone()),
            b"definitely not an image",
            None,
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_image");
    assert!(photos.is_empty().await);
}
