//! CIFAR-100 label taxonomy.
//!
//! `FINE_LABELS` is indexed by the fine label byte of the dataset and
//! `COARSE_TO_FINE` is ordered by the coarse label byte. Every fine label
//! belongs to exactly one coarse bucket.

use std::collections::HashMap;
use std::sync::LazyLock;

pub const NUM_FINE_LABELS: usize = 100;
pub const NUM_COARSE_LABELS: usize = 20;

#[rustfmt::skip]
pub const FINE_LABELS: [&str; NUM_FINE_LABELS] = [
    "apple", "aquarium_fish", "baby", "bear", "beaver",
    "bed", "bee", "beetle", "bicycle", "bottle",
    "bowl", "boy", "bridge", "bus", "butterfly",
    "camel", "can", "castle", "caterpillar", "cattle",
    "chair", "chimpanzee", "clock", "cloud", "cockroach",
    "couch", "crab", "crocodile", "cup", "dinosaur",
    "dolphin", "elephant", "flatfish", "forest", "fox",
    "girl", "hamster", "house", "kangaroo", "computer_keyboard",
    "lamp", "lawn_mower", "leopard", "lion", "lizard",
    "lobster", "man", "maple_tree", "motorcycle", "mountain",
    "mouse", "mushroom", "oak_tree", "orange", "orchid",
    "otter", "palm_tree", "pear", "pickup_truck", "pine_tree",
    "plain", "plate", "poppy", "porcupine", "possum",
    "rabbit", "raccoon", "ray", "road", "rocket",
    "rose", "sea", "seal", "shark", "shrew",
    "skunk", "skyscraper", "snail", "snake", "spider",
    "squirrel", "streetcar", "sunflower", "sweet_pepper", "table",
    "tank", "telephone", "television", "tiger", "tractor",
    "train", "trout", "tulip", "turtle", "wardrobe",
    "whale", "willow_tree", "wolf", "woman", "worm",
];

pub const COARSE_TO_FINE: [(&str, [&str; 5]); NUM_COARSE_LABELS] = [
    ("aquatic mammals", ["beaver", "dolphin", "otter", "seal", "whale"]),
    ("fish", ["aquarium_fish", "flatfish", "ray", "shark", "trout"]),
    ("flowers", ["orchid", "poppy", "rose", "sunflower", "tulip"]),
    ("food containers", ["bottle", "bowl", "can", "cup", "plate"]),
    (
        "fruit and vegetables",
        ["apple", "mushroom", "orange", "pear", "sweet_pepper"],
    ),
    (
        "household electrical device",
        ["clock", "computer_keyboard", "lamp", "telephone", "television"],
    ),
    (
        "household furniture",
        ["bed", "chair", "couch", "table", "wardrobe"],
    ),
    (
        "insects",
        ["bee", "beetle", "butterfly", "caterpillar", "cockroach"],
    ),
    ("large carnivores", ["bear", "leopard", "lion", "tiger", "wolf"]),
    (
        "large man-made outdoor things",
        ["bridge", "castle", "house", "road", "skyscraper"],
    ),
    (
        "large natural outdoor scenes",
        ["cloud", "forest", "mountain", "plain", "sea"],
    ),
    (
        "large omnivores and herbivores",
        ["camel", "cattle", "chimpanzee", "elephant", "kangaroo"],
    ),
    (
        "medium-sized mammals",
        ["fox", "porcupine", "possum", "raccoon", "skunk"],
    ),
    (
        "non-insect invertebrates",
        ["crab", "lobster", "snail", "spider", "worm"],
    ),
    ("people", ["baby", "boy", "girl", "man", "woman"]),
    (
        "reptiles",
        ["crocodile", "dinosaur", "lizard", "snake", "turtle"],
    ),
    (
        "small mammals",
        ["hamster", "mouse", "rabbit", "shrew", "squirrel"],
    ),
    (
        "trees",
        ["maple_tree", "oak_tree", "palm_tree", "pine_tree", "willow_tree"],
    ),
    (
        "vehicles 1",
        ["bicycle", "bus", "motorcycle", "pickup_truck", "train"],
    ),
    (
        "vehicles 2",
        ["lawn_mower", "rocket", "streetcar", "tank", "tractor"],
    ),
];

static FINE_TO_COARSE: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    COARSE_TO_FINE
        .iter()
        .flat_map(|(coarse, fines)| fines.iter().map(move |fine| (*fine, *coarse)))
        .collect()
});

pub fn fine_label(index: u8) -> Option<&'static str> {
    FINE_LABELS.get(index as usize).copied()
}

pub fn coarse_label(fine: &str) -> Option<&'static str> {
    FINE_TO_COARSE.get(fine).copied()
}

pub fn coarse_labels() -> impl Iterator<Item = &'static str> {
    COARSE_TO_FINE.iter().map(|(coarse, _)| *coarse)
}
