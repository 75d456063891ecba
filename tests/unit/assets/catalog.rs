use super::*;
use crate::assets::synthetic::SyntheticBackend;

fn catalog() -> MediaCatalog {
    MediaCatalog::new(Arc::new(SyntheticBackend))
}

#[test]
fn register_then_get_exposes_probed_metadata() {
    let cat = catalog();
    let id = cat.register("synthetic:ffffff:1920x1080:5").unwrap();
    let a = cat.get(id).unwrap();
    assert_eq!(a.id, id);
    assert_eq!(a.duration, 5.0);
    assert_eq!((a.resolution.width, a.resolution.height), (1920, 1080));
    assert!(cat.contains(id));
    assert_eq!(cat.len(), 1);
}

#[test]
fn unknown_id_is_not_found() {
    let cat = catalog();
    assert!(matches!(
        cat.get(AssetId(42)),
        Err(MontageError::NotFound(_))
    ));
}

#[test]
fn unreadable_locator_leaves_catalog_unchanged() {
    let cat = catalog();
    let err = cat.register("synthetic:nope").unwrap_err();
    assert!(matches!(err, MontageError::MediaUnreadable { .. }));
    assert!(cat.is_empty());

    let err = cat.register("   ").unwrap_err();
    assert!(matches!(err, MontageError::MediaUnreadable { .. }));
}

#[test]
fn non_positive_duration_is_unreadable() {
    let cat = catalog();
    let err = cat.register("synthetic:ffffff:8x8:0").unwrap_err();
    assert!(matches!(err, MontageError::MediaUnreadable { .. }));
}

#[test]
fn register_all_keeps_input_order_and_isolates_failures() {
    let cat = catalog();
    let locators = [
        "synthetic:ff0000:8x8:1",
        "broken",
        "synthetic:00ff00:8x8:2",
        "synthetic:0000ff:8x8:3",
    ];
    let results = cat.register_all(&locators);
    assert_eq!(results.len(), 4);
    assert!(results[1].is_err());

    let durations: Vec<f64> = [0usize, 2, 3]
        .iter()
        .map(|&i| cat.get(*results[i].as_ref().unwrap()).unwrap().duration)
        .collect();
    assert_eq!(durations, vec![1.0, 2.0, 3.0]);
    assert_eq!(cat.len(), 3);
}

#[test]
fn assets_are_listed_in_id_order() {
    let cat = catalog();
    for d in 1..=5 {
        cat.register(&format!("synthetic:ffffff:2x2:{d}")).unwrap();
    }
    let ids: Vec<AssetId> = cat.assets().iter().map(|a| a.id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
    assert_eq!(ids.len(), 5);
}
