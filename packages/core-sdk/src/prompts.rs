use serde_json::{json, Value};

use crate::models::Persona;

pub const SEARCH_SYSTEM: &str = "You are a simulator of the LimeWire Gnutella network in 2005.";
pub const FORUM_SYSTEM: &str = "You are a simulator of the P2P Scene forums in 2005.";

pub fn search_prompt(query: &str) -> String {
    format!(
        "Generate 15 realistic early 2000s era P2P search results for the query: \"{}\". \
         Include a mix of high quality and lower quality files. \
         Use nostalgic file naming conventions (underscores, 'rip', 'full album', maybe a fake .exe virus or two labeled as the song). \
         Ensure file sizes are realistic for the era (e.g. 3-5MB for MP3s, 700MB for movies).",
        query
    )
}

pub fn peer_library_query(peer_id: &str) -> String {
    format!("Shared library of {}", peer_id)
}

pub fn chat_prompt(last_message: &str) -> String {
    format!(
        "The user said: \"{}\" in a 2005 internet chatroom. Reply as a random internet stranger from that era. \
         Use leet speak, abbreviations (lol, rofl, asl, brb), and reference 2005 culture. Keep it short (under 15 words).",
        last_message
    )
}

fn persona_tone(persona: Persona) -> &'static str {
    match persona {
        Persona::Clippy => "Be overly helpful but slightly annoying/condescending.",
        Persona::Bonzi => {
            "Be a bit chaotic, use 'purple' energy, and act like you are helpful but probably spying."
        }
    }
}

pub fn assistant_system(persona: Persona) -> String {
    format!(
        "You are {}, a nostalgic Windows XP era desktop assistant. {}",
        persona.as_str(),
        persona_tone(persona)
    )
}

pub fn assistant_prompt(user_text: &str) -> String {
    format!("The user says: \"{}\". Keep it under 20 words.", user_text)
}

pub fn forum_prompt(topic: &str) -> String {
    format!(
        "Generate a funny, nostalgic vBulletin forum thread about: \"{}\". \
         Make it feel like a mid-2000s tech or file-sharing forum. \
         Include some heated arguments (flame wars) and helpful but slightly wrong advice.",
        topic
    )
}

/**
 * \brief 搜索结果的 responseSchema（Gemini OpenAPI 子集）。
 */
pub fn search_result_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "results": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "filename": {"type": "STRING"},
                        "size": {"type": "STRING"},
                        "type": {"type": "STRING"},
                        "bitrate": {"type": "STRING"},
                        "speed": {"type": "STRING"},
                        "artist": {"type": "STRING"},
                        "album": {"type": "STRING"},
                        "quality": {"type": "INTEGER", "description": "Rating from 1 to 5"}
                    },
                    "required": ["filename", "size", "type", "bitrate", "speed", "artist", "quality"]
                }
            }
        },
        "required": ["results"]
    })
}

pub fn forum_thread_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {"type": "STRING"},
            "posts": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "user": {"type": "STRING"},
                        "rank": {"type": "STRING"},
                        "avatarType": {"type": "STRING"},
                        "content": {"type": "STRING"},
                        "signature": {"type": "STRING"}
                    },
                    "required": ["user", "rank", "avatarType", "content", "signature"]
                }
            }
        },
        "required": ["title", "posts"]
    })
}
