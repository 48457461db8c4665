//! Flatten JSON chat components to plain text.

use serde_json::Value;

/// Render a chat component (as sent in Chat Message and Disconnect) as plain
/// text. Anything that is not JSON is returned unchanged.
pub fn plain_text(json: &str) -> String {
    match serde_json::from_str::<Value>(json) {
        Ok(value) => {
            let mut out = String::new();
            flatten(&value, &mut out);
            out
        }
        Err(_) => json.to_string(),
    }
}

fn flatten(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Array(parts) => parts.iter().for_each(|p| flatten(p, out)),
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get("text") {
                out.push_str(text);
            } else if let Some(Value::String(key)) = map.get("translate") {
                translate(key, map.get("with"), out);
            }
            if let Some(Value::Array(extra)) = map.get("extra") {
                extra.iter().for_each(|p| flatten(p, out));
            }
        }
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Null => {}
    }
}

/// No language files, so a translation renders as its key followed by the
/// flattened arguments. The common chat keys get their vanilla shape.
fn translate(key: &str, with: Option<&Value>, out: &mut String) {
    let args: Vec<String> = match with {
        Some(Value::Array(args)) => args
            .iter()
            .map(|a| {
                let mut s = String::new();
                flatten(a, &mut s);
                s
            })
            .collect(),
        _ => Vec::new(),
    };

    match (key, args.as_slice()) {
        ("chat.type.text", [who, msg]) => out.push_str(&format!("<{}> {}", who, msg)),
        ("chat.type.announcement", [who, msg]) => out.push_str(&format!("[{}] {}", who, msg)),
        ("chat.type.emote", [who, msg]) => out.push_str(&format!("* {} {}", who, msg)),
        ("multiplayer.player.joined", [who]) => out.push_str(&format!("{} joined the game", who)),
        ("multiplayer.player.left", [who]) => out.push_str(&format!("{} left the game", who)),
        _ => {
            out.push_str(key);
            for arg in &args {
                out.push(' ');
                out.push_str(arg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_extra_are_concatenated() {
        let json = r#"{"text":"Hello ","extra":[{"text":"wor","bold":true},"ld"]}"#;
        assert_eq!(plain_text(json), "Hello world");
    }

    #[test]
    fn chat_translation_gets_vanilla_shape() {
        let json = r#"{"translate":"chat.type.text","with":[{"text":"Steve"},"hi"]}"#;
        assert_eq!(plain_text(json), "<Steve> hi");
    }

    #[test]
    fn unknown_translation_keeps_key() {
        let json = r#"{"translate":"death.attack.fall","with":["Alex"]}"#;
        assert_eq!(plain_text(json), "death.attack.fall Alex");
    }

    #[test]
    fn non_json_is_returned_as_is() {
        assert_eq!(plain_text("You are banned"), "You are banned");
        assert_eq!(plain_text(r#""quoted""#), "quoted");
    }
}
