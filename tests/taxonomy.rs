use std::collections::HashSet;

use dataset_zoo::taxonomy::{self, COARSE_TO_FINE, FINE_LABELS};

#[test]
fn coarse_groups_partition_fine_labels() {
    assert_eq!(COARSE_TO_FINE.len(), 20);
    let mut seen = HashSet::new();
    for (coarse, fines) in COARSE_TO_FINE.iter() {
        assert_eq!(fines.len(), 5, "{coarse}");
        for fine in fines {
            assert!(seen.insert(*fine), "{fine} listed twice");
        }
    }
    let all: HashSet<&str> = FINE_LABELS.iter().copied().collect();
    assert_eq!(seen, all);
    assert_eq!(all.len(), 100);
}

#[test]
fn every_fine_label_has_a_coarse_label() {
    for index in 0..100u8 {
        let fine = taxonomy::fine_label(index).unwrap();
        assert!(taxonomy::coarse_label(fine).is_some(), "{fine}");
    }
    assert_eq!(taxonomy::fine_label(100), None);
}

#[test]
fn known_lookups() {
    assert_eq!(taxonomy::fine_label(0), Some("apple"));
    assert_eq!(taxonomy::fine_label(1), Some("aquarium_fish"));
    assert_eq!(
        taxonomy::coarse_label("computer_keyboard"),
        Some("household electrical device")
    );
    assert_eq!(taxonomy::coarse_label("pickup_truck"), Some("vehicles 1"));
    assert_eq!(taxonomy::coarse_label("not_a_label"), None);
    assert_eq!(taxonomy::coarse_labels().count(), 20);
}
