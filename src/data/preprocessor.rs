// ============================================================
// Layer 4 - Text Preprocessor
// ============================================================
// Normalises PubMed titles and abstracts before indexing.
//
// Dumps exported from PubMed XML often contain:
//   - Non-breaking spaces (U+00A0) and zero-width spaces (U+200B)
//   - Byte order marks from concatenated files
//   - Line breaks inside structured abstracts
//     (BACKGROUND: ... \n METHODS: ...)
//   - Tabs and runs of spaces from XML indentation
//
// Every field ends up on ONE line with single spaces, so the
// persisted JSONL stays one document per line and the english
// analyzer never sees invisible tokens.
//
// Reference: Rust Book §8 (Strings in Rust)

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    pub fn clean(&self, text: &str) -> String {
        // ── Step 1: every whitespace-like or control char becomes a space ────
        let spaced = text.chars().map(|c| match c {
            '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
            c if c.is_whitespace() || c.is_control() => ' ',
            c => c,
        });

        // ── Step 2: collapse runs of spaces and trim ──────────────────────────
        let mut out        = String::with_capacity(text.len());
        let mut last_space = true;
        for c in spaced {
            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }
        if out.ends_with(' ') {
            out.pop();
        }
        out
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
