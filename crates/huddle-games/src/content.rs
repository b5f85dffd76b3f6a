//! Built-in decks: words, prompts and questions the games deal from.

/// Secret words for Imposter rounds.
pub const IMPOSTER_WORDS: &[&str] = &[
    "Beach", "Library", "Volcano", "Submarine", "Circus", "Hospital", "Pyramid", "Bakery",
    "Airport", "Castle", "Jungle", "Museum", "Casino", "Space Station", "Farm", "Subway",
    "Wedding", "Zoo", "Cinema", "Igloo",
];

/// Words the Insider master and insider know.
pub const INSIDER_WORDS: &[&str] = &[
    "Umbrella", "Penguin", "Lighthouse", "Telescope", "Pancake", "Skateboard", "Compass",
    "Avocado", "Hammock", "Snowman", "Violin", "Cactus", "Helicopter", "Tornado", "Backpack",
];

/// Wavelength spectrums: (left end, right end).
pub const SPECTRUMS: &[(&str, &str)] = &[
    ("Cold", "Hot"),
    ("Underrated", "Overrated"),
    ("Useless", "Useful"),
    ("Boring", "Exciting"),
    ("Cheap", "Expensive"),
    ("Villain", "Hero"),
    ("Quiet", "Loud"),
    ("Healthy", "Unhealthy"),
    ("Easy to spell", "Hard to spell"),
    ("Normal pet", "Weird pet"),
    ("Breakfast food", "Dinner food"),
    ("Round", "Pointy"),
    ("Fad", "Classic"),
    ("Smells bad", "Smells good"),
];

/// Letters NPAT rounds are played on.
pub const NPAT_LETTERS: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'R', 'S',
    'T', 'W',
];

/// Fill-in-the-blank setups for Punchline.
pub const PUNCHLINE_PROMPTS: &[&str] = &[
    "The worst thing to hear from your pilot: ____",
    "A rejected flavour of ice cream: ____",
    "What the dog is actually thinking: ____",
    "The secret ingredient in grandma's soup: ____",
    "A terrible name for a boat: ____",
    "The real reason the dinosaurs died out: ____",
    "What you should never say at a job interview: ____",
    "The ninth planet's biggest export: ____",
    "A bad slogan for a dentist: ____",
    "The least popular superhero power: ____",
];

/// What Doodle Duel duelists draw.
pub const DOODLE_PROMPTS: &[&str] = &[
    "A cat riding a bicycle",
    "The moon on vacation",
    "A haunted toaster",
    "A robot learning to dance",
    "A dragon at the dentist",
    "A very tired cloud",
    "Spaghetti monster",
    "A snail race",
    "An octopus chef",
    "A pineapple in sunglasses",
];

/// A multiple-choice Trivia Royale question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriviaCard {
    pub question: &'static str,
    pub choices: [&'static str; 4],
    pub answer: u8,
}

/// Trivia Royale questions.
pub const TRIVIA: &[TriviaCard] = &[
    TriviaCard {
        question: "Which planet is known as the Red Planet?",
        choices: ["Venus", "Mars", "Jupiter", "Mercury"],
        answer: 1,
    },
    TriviaCard {
        question: "How many legs does a spider have?",
        choices: ["Six", "Ten", "Eight", "Twelve"],
        answer: 2,
    },
    TriviaCard {
        question: "What is the largest ocean on Earth?",
        choices: ["Pacific", "Atlantic", "Indian", "Arctic"],
        answer: 0,
    },
    TriviaCard {
        question: "Which element has the chemical symbol O?",
        choices: ["Gold", "Osmium", "Oxygen", "Oganesson"],
        answer: 2,
    },
    TriviaCard {
        question: "In which country are the Great Pyramids of Giza?",
        choices: ["Mexico", "Peru", "Sudan", "Egypt"],
        answer: 3,
    },
    TriviaCard {
        question: "How many minutes are in a day?",
        choices: ["1440", "1240", "1600", "3600"],
        answer: 0,
    },
    TriviaCard {
        question: "Which instrument has 88 keys?",
        choices: ["Organ", "Piano", "Accordion", "Harpsichord"],
        answer: 1,
    },
    TriviaCard {
        question: "What is the tallest animal?",
        choices: ["Elephant", "Moose", "Giraffe", "Ostrich"],
        answer: 2,
    },
    TriviaCard {
        question: "What is frozen water called?",
        choices: ["Steam", "Ice", "Dew", "Fog"],
        answer: 1,
    },
    TriviaCard {
        question: "Which continent is the Sahara in?",
        choices: ["Asia", "Australia", "South America", "Africa"],
        answer: 3,
    },
    TriviaCard {
        question: "How many sides does a hexagon have?",
        choices: ["Six", "Five", "Seven", "Eight"],
        answer: 0,
    },
    TriviaCard {
        question: "What gas do plants absorb from the air?",
        choices: ["Nitrogen", "Helium", "Carbon dioxide", "Hydrogen"],
        answer: 2,
    },
];

/// This-or-That dilemmas: (this, that).
pub const THIS_OR_THAT: &[(&str, &str)] = &[
    ("Cats", "Dogs"),
    ("Beach", "Mountains"),
    ("Coffee", "Tea"),
    ("Sunrise", "Sunset"),
    ("Books", "Movies"),
    ("Pizza", "Burgers"),
    ("Summer", "Winter"),
    ("Call", "Text"),
    ("Sweet", "Savory"),
    ("City", "Countryside"),
    ("Early bird", "Night owl"),
];

/// Hot Takes statements, rated 1 (disagree) to 5 (agree).
pub const HOT_TAKES: &[&str] = &[
    "Pineapple belongs on pizza",
    "Cereal is a soup",
    "Sequels are usually better than the original",
    "Breakfast is the most overrated meal",
    "Socks with sandals are fine",
    "Board games beat video games",
    "Winter is the best season",
    "Hot dogs are sandwiches",
    "Tea is better than coffee",
    "Reply-all should be banned",
];

/// Never-Ever prompts ("Never have I ever ...").
pub const NEVER_EVER: &[&str] = &[
    "Never have I ever fallen asleep in a cinema",
    "Never have I ever sent a text to the wrong person",
    "Never have I ever broken a bone",
    "Never have I ever sung karaoke",
    "Never have I ever been on a boat",
    "Never have I ever eaten a whole pizza alone",
    "Never have I ever forgotten a friend's birthday",
    "Never have I ever ridden a horse",
    "Never have I ever locked myself out",
    "Never have I ever cried at a cartoon",
];

/// Bet-or-Bluff estimation questions.
pub const ESTIMATES: &[&str] = &[
    "How many countries are there in Africa?",
    "How tall is the Eiffel Tower, in metres?",
    "How many bones are in the adult human body?",
    "In what year was the first email sent?",
    "How many keys are on a standard computer keyboard?",
    "How many episodes of your favourite show exist?",
    "How many kilometres is it from London to Paris?",
    "How many languages are spoken in the world?",
];
