//! Default documents embedded in the binary and seeded by `init` (§4.8): note-writing
//! guidance and a description file for each of the four built-in note types.

use rust_embed::RustEmbed;

/// Default tag/type taxonomy shipped with a fresh repository.
pub const DEFAULT_TYPES: &[&str] = &["decision", "pattern", "gotcha", "explanation"];

#[derive(RustEmbed)]
#[folder = "assets/defaults"]
struct Defaults;

/// The default `note-guidance.md` content, seeded by `init`.
pub fn note_guidance() -> &'static str {
    embedded_str("note-guidance.md")
}

/// The default description for one of [`DEFAULT_TYPES`], or `None` for any other name.
pub fn default_type_description(name: &str) -> Option<&'static str> {
    if !DEFAULT_TYPES.contains(&name) {
        return None;
    }
    Some(embedded_str(&format!("types/{name}.md")))
}

fn embedded_str(path: &str) -> &'static str {
    let file = Defaults::get(path).unwrap_or_else(|| panic!("missing embedded default asset: {path}"));
    match file.data {
        std::borrow::Cow::Borrowed(bytes) => {
            std::str::from_utf8(bytes).expect("embedded default asset is not valid UTF-8")
        }
        std::borrow::Cow::Owned(_) => {
            // rust-embed only returns an owned Cow when debug-embedding is active (dev builds
            // reading straight off disk); leak once per process rather than threading a
            // lifetime through every caller for an asset that is, in practice, read once.
            let s = String::from_utf8(file.data.into_owned()).expect("embedded default asset is not valid UTF-8");
            Box::leak(s.into_boxed_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_guidance_is_nonempty() {
        assert!(note_guidance().contains("Anchor every note"));
    }

    #[test]
    fn every_default_type_has_a_description() {
        for name in DEFAULT_TYPES {
            assert!(default_type_description(name).is_some(), "missing description for {name}");
        }
    }

    #[test]
    fn unknown_type_has_no_default_description() {
        assert!(default_type_description("not-a-real-type").is_none());
    }
}
