//! Input tokenizer for the gateway's cumulative dial string

/// Separator between successive inputs, e.g. `1*Asha*Mwanza`
pub const DELIMITER: char = '*';

/// Most recent input of a delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub token: String,
    /// Number of inputs the gateway has delivered so far; zero on first contact
    pub depth: usize,
}

impl Input {
    /// A delivery that carries nothing newer than what the session already applied
    pub fn is_replay(&self, inputs_seen: usize) -> bool {
        self.depth > 0 && self.depth <= inputs_seen
    }
}

/// Extract the latest token. Never fails; malformed text degrades to an empty token.
pub fn tokenize(text: &str) -> Input {
    let text = text.trim();
    if text.is_empty() {
        return Input {
            token: String::new(),
            depth: 0,
        };
    }

    let mut depth = 0;
    let mut last = "";
    for part in text.split(DELIMITER) {
        depth += 1;
        last = part;
    }

    Input {
        token: last.trim().to_string(),
        depth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_contact() {
        assert_eq!(
            tokenize(""),
            Input {
                token: String::new(),
                depth: 0
            }
        );
        assert_eq!(tokenize("   ").depth, 0);
    }

    #[test]
    fn test_last_token_wins() {
        let input = tokenize("1*Asha*Mwanza");
        assert_eq!(input.token, "Mwanza");
        assert_eq!(input.depth, 3);

        assert_eq!(tokenize("4").token, "4");
        assert_eq!(tokenize("1* Asha Juma ").token, "Asha Juma");
    }

    #[test]
    fn test_malformed_text_degrades_to_empty_token() {
        assert_eq!(tokenize("*").token, "");
        assert_eq!(tokenize("***").token, "");
        assert_eq!(tokenize("1*").token, "");
        assert_eq!(tokenize("1*").depth, 2);
    }

    #[test]
    fn test_replay_detection() {
        let input = tokenize("1*Asha");
        assert!(input.is_replay(2));
        assert!(input.is_replay(5));
        assert!(!input.is_replay(1));
        assert!(!tokenize("").is_replay(3));
    }
}
