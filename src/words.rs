use crate::rng::Rng;
use crate::types::ParticipantId;

/// Main word first, impostor word second.
pub const WORD_PAIRS: &[(&str, &str)] = &[
    ("apple", "pear"),
    ("banana", "plantain"),
    ("carrot", "parsnip"),
    ("diamond", "crystal"),
    ("elephant", "mammoth"),
    ("flower", "blossom"),
    ("guitar", "ukulele"),
    ("hamburger", "sandwich"),
    ("igloo", "cabin"),
    ("jacket", "sweater"),
    ("kangaroo", "wallaby"),
    ("lemon", "lime"),
    ("mountain", "hill"),
    ("notebook", "journal"),
    ("octopus", "squid"),
    ("penguin", "seagull"),
    ("queen", "princess"),
    ("rainbow", "spectrum"),
    ("sunshine", "daylight"),
    ("tiger", "lion"),
    ("umbrella", "parasol"),
    ("volcano", "mountain"),
    ("waterfall", "cascade"),
    ("xylophone", "marimba"),
    ("yogurt", "pudding"),
    ("zebra", "horse"),
    ("airplane", "helicopter"),
    ("butterfly", "moth"),
    ("chocolate", "candy"),
    ("dolphin", "porpoise"),
];

const SURROGATE_NAMES: &[&str] = &[
    "RoboRune",
    "BotBuddy",
    "AIPlayer",
    "CyberFriend",
    "VirtualPal",
    "DigiMate",
    "AutoPlayer",
    "BotBrain",
    "SynthPlayer",
    "RoboGamer",
];

const SURROGATE_AVATARS: &[&str] = &[
    "/images/bots/bot1.svg",
    "/images/bots/bot2.svg",
    "/images/bots/bot3.svg",
    "/images/bots/bot4.svg",
    "/images/bots/bot5.svg",
];

const FOOD_WORDS: &[&str] = &[
    "apple",
    "banana",
    "carrot",
    "hamburger",
    "lemon",
    "yogurt",
    "chocolate",
];
const ANIMAL_WORDS: &[&str] = &[
    "elephant",
    "kangaroo",
    "penguin",
    "tiger",
    "zebra",
    "butterfly",
    "dolphin",
];
const NATURE_WORDS: &[&str] = &[
    "flower",
    "mountain",
    "rainbow",
    "sunshine",
    "volcano",
    "waterfall",
];

const FOOD_LINES: &[&str] = &[
    "You can eat this.",
    "It's something edible.",
    "You might find this in a kitchen.",
    "It has a distinct taste.",
    "Some people really enjoy this.",
];
const ANIMAL_LINES: &[&str] = &[
    "It's a living creature.",
    "You might see this at a zoo.",
    "It has a distinctive appearance.",
    "It makes a specific sound.",
    "It's a type of animal.",
];
const NATURE_LINES: &[&str] = &[
    "It's found in nature.",
    "It's related to the outdoors.",
    "It's a natural phenomenon.",
    "It's something you'd see outside.",
    "It's part of our environment.",
];
const OBJECT_LINES: &[&str] = &[
    "You can hold this in your hand.",
    "It has a specific function.",
    "It's used for a particular purpose.",
    "You might have one at home.",
    "It's a physical object.",
];
const GENERIC_LINES: &[&str] = &[
    "It's something I use often.",
    "I've seen this before.",
    "It's quite common.",
    "I think most people know what this is.",
    "It's a familiar object to most people.",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordCategory {
    Food,
    Animal,
    Nature,
    Object,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordPair {
    pub main: String,
    pub impostor: String,
}

pub fn pick_word_pair(rng: &mut Rng) -> WordPair {
    let (main, impostor) = WORD_PAIRS[rng.pick_index(WORD_PAIRS.len())];
    WordPair {
        main: main.to_string(),
        impostor: impostor.to_string(),
    }
}

/// Fixed-for-the-round description order.
pub fn shuffled_order(ids: &[ParticipantId], rng: &mut Rng) -> Vec<ParticipantId> {
    let mut order = ids.to_vec();
    rng.shuffle(&mut order);
    order
}

pub fn categorize(word: &str) -> WordCategory {
    if FOOD_WORDS.contains(&word) {
        WordCategory::Food
    } else if ANIMAL_WORDS.contains(&word) {
        WordCategory::Animal
    } else if NATURE_WORDS.contains(&word) {
        WordCategory::Nature
    } else {
        WordCategory::Object
    }
}

pub fn surrogate_description(word: &str, rng: &mut Rng) -> String {
    let lines = if word.is_empty() {
        GENERIC_LINES
    } else {
        match categorize(word) {
            WordCategory::Food => FOOD_LINES,
            WordCategory::Animal => ANIMAL_LINES,
            WordCategory::Nature => NATURE_LINES,
            WordCategory::Object => OBJECT_LINES,
        }
    };
    lines[rng.pick_index(lines.len())].to_string()
}

pub fn surrogate_name(index: usize, rng: &mut Rng) -> String {
    let base = SURROGATE_NAMES[rng.pick_index(SURROGATE_NAMES.len())];
    format!("{base}-{index}")
}

pub fn surrogate_avatar(rng: &mut Rng) -> String {
    SURROGATE_AVATARS[rng.pick_index(SURROGATE_AVATARS.len())].to_string()
}
