//! Identifier and project-name generation.
//!
//! These helpers back the naming backfill that runs during state
//! migration: workflows persisted before project names existed get one
//! synthesized from whatever descriptive text is available.

use rand::Rng;

const NANO_ID_LEN: usize = 8;
const NANO_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Fallback slug used when no descriptive seed survives slugification.
const DEFAULT_NAME_STEM: &str = "app";

/// Generates a short opaque token.
///
/// Collision-resistant enough for per-session naming; not globally
/// unique across all time.
pub fn generate_nano_id() -> String {
    let mut rng = rand::thread_rng();
    (0..NANO_ID_LEN)
        .map(|_| NANO_ID_ALPHABET[rng.gen_range(0..NANO_ID_ALPHABET.len())] as char)
        .collect()
}

/// Derives a project name from a descriptive seed and a unique token.
///
/// The seed is slugified (lowercased, non-alphanumeric runs collapsed to
/// a single dash) and the token appended. The result is always non-empty
/// and never longer than `max_length`, even for an empty or absent seed:
/// when the combined name overflows, the descriptive part is trimmed
/// first so the unique suffix survives.
pub fn generate_project_name(seed: Option<&str>, unique: &str, max_length: usize) -> String {
    let slug = slugify(seed.unwrap_or(""));
    let stem = if slug.is_empty() {
        DEFAULT_NAME_STEM.to_string()
    } else {
        slug
    };

    let mut name = format!("{stem}-{unique}");
    if name.len() > max_length {
        let stem_budget = max_length.saturating_sub(unique.len() + 1);
        if stem_budget == 0 {
            name = unique.chars().take(max_length.max(1)).collect();
        } else {
            let trimmed: String = stem.chars().take(stem_budget).collect();
            name = format!("{}-{}", trimmed.trim_end_matches('-'), unique);
        }
    }

    if name.is_empty() {
        name = DEFAULT_NAME_STEM.chars().take(max_length.max(1)).collect();
    }
    name
}

fn slugify(raw: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nano_id_shape() {
        let id = generate_nano_id();
        assert_eq!(id.len(), NANO_ID_LEN);
        assert!(id.bytes().all(|b| NANO_ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_nano_ids_differ() {
        assert_ne!(generate_nano_id(), generate_nano_id());
    }

    #[test]
    fn test_project_name_from_seed() {
        let name = generate_project_name(Some("blog-starter"), "x7k2p9ab", 20);
        assert!(name.starts_with("blog-start"));
        assert!(name.ends_with("x7k2p9ab"));
        assert!(name.len() <= 20);
    }

    #[test]
    fn test_project_name_without_seed() {
        let name = generate_project_name(None, "x7k2p9ab", 20);
        assert_eq!(name, "app-x7k2p9ab");
    }

    #[test]
    fn test_project_name_empty_seed() {
        let name = generate_project_name(Some("   "), "x7k2p9ab", 20);
        assert_eq!(name, "app-x7k2p9ab");
    }

    #[test]
    fn test_project_name_slugifies_free_text() {
        let name = generate_project_name(Some("Build me a Todo App!"), "x7k2p9ab", 40);
        assert_eq!(name, "build-me-a-todo-app-x7k2p9ab");
    }

    #[test]
    fn test_project_name_respects_tight_bound() {
        let name = generate_project_name(Some("a very long descriptive seed"), "x7k2p9ab", 12);
        assert!(!name.is_empty());
        assert!(name.len() <= 12);
        assert!(name.ends_with("x7k2p9ab"));
    }

    #[test]
    fn test_project_name_bound_smaller_than_token() {
        let name = generate_project_name(Some("seed"), "x7k2p9ab", 4);
        assert_eq!(name, "x7k2");
    }
}
