//! Zero-shot prompts the model scores images against.
//!
//! The exported model emits one logit per prompt, categories first and then
//! genres, in exactly this order.

/// The first `GAME_LABEL_COUNT` entries are game prompts, the rest are not.
pub const CATEGORY_PROMPTS: [&str; 16] = [
    "a screenshot from a video game",
    "a video game screenshot with gameplay",
    "a screenshot from a PC or console game",
    "an in-game screenshot showing game graphics",
    "a screenshot of code or programming IDE",
    "a screenshot of a text editor or terminal",
    "an anime or manga image",
    "a hentai or adult anime image",
    "a screenshot of a web browser",
    "a screenshot of a desktop or file explorer",
    "a photo of a real person or selfie",
    "a photograph of real life scenery",
    "a screenshot of social media",
    "a screenshot of a chat or messaging app",
    "a document or spreadsheet screenshot",
    "a meme or image with text overlay",
];

pub const GAME_LABEL_COUNT: usize = 4;

pub const CODE_LABELS: [usize; 2] = [4, 5];
pub const ANIME_LABELS: [usize; 2] = [6, 7];
pub const BROWSER_LABEL: usize = 8;

/// (category key, detected game label, prompt)
pub const GENRES: [(&str, &str, &str); 8] = [
    ("rpg", "RPG Adventure", "a screenshot from an RPG or role-playing game with fantasy elements"),
    ("action", "Action Game", "a screenshot from an action or shooter game with combat"),
    ("scifi", "Sci-Fi Game", "a screenshot from a sci-fi game with futuristic technology"),
    ("landscape", "Open World", "a scenic landscape screenshot from an open world game"),
    ("racing", "Racing Game", "a screenshot from a racing or driving game"),
    ("horror", "Horror Game", "a screenshot from a horror or survival game"),
    ("sports", "Sports Game", "a screenshot from a sports game"),
    ("strategy", "Strategy Game", "a screenshot from a strategy or simulation game"),
];

pub const DEFAULT_CATEGORY: &str = "gaming";
pub const DEFAULT_GAME: &str = "Video Game";

/// Filename substrings that mark a file as a game capture when the model is unavailable.
pub const KNOWN_GAME_PATTERNS: [&str; 18] = [
    "valorant", "csgo", "cs2", "fortnite", "apex", "minecraft", "gta", "skyrim", "elden",
    "cyberpunk", "witcher", "halo", "destiny", "overwatch", "league", "dota", "steam", "nvidia",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSet {
    Categories,
    Genres,
}

impl PromptSet {
    pub fn len(&self) -> usize {
        match self {
            PromptSet::Categories => CATEGORY_PROMPTS.len(),
            PromptSet::Genres => GENRES.len(),
        }
    }

    /// Offset of this set's logits in the model output.
    pub fn offset(&self) -> usize {
        match self {
            PromptSet::Categories => 0,
            PromptSet::Genres => CATEGORY_PROMPTS.len(),
        }
    }

    pub fn total_logits() -> usize {
        CATEGORY_PROMPTS.len() + GENRES.len()
    }
}
