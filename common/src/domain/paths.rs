//! Canonical locations of library files inside the connected repository.
//!
//! ```text
//! <folder>/globals.json
//! <folder>/agentsmith.types.ts
//! <folder>/prompts/<slug>/prompt.json
//! <folder>/prompts/<slug>/<version>/version.json
//! <folder>/prompts/<slug>/<version>/variables.json
//! <folder>/prompts/<slug>/<version>/content.j2
//! ```

pub const PROMPTS_DIR: &str = "prompts";
pub const GLOBALS_FILE: &str = "globals.json";
pub const TYPES_FILE: &str = "agentsmith.types.ts";
pub const PROMPT_FILE: &str = "prompt.json";
pub const VERSION_FILE: &str = "version.json";
pub const VARIABLES_FILE: &str = "variables.json";
pub const CONTENT_EXTENSION: &str = "j2";

pub fn globals_path(folder: &str) -> String {
    join(folder, GLOBALS_FILE)
}

pub fn types_path(folder: &str) -> String {
    join(folder, TYPES_FILE)
}

pub fn prompt_dir(folder: &str, slug: &str) -> String {
    join(folder, &format!("{}/{}", PROMPTS_DIR, slug))
}

pub fn prompt_path(folder: &str, slug: &str) -> String {
    format!("{}/{}", prompt_dir(folder, slug), PROMPT_FILE)
}

pub fn version_dir(folder: &str, slug: &str, version: &str) -> String {
    format!("{}/{}", prompt_dir(folder, slug), version)
}

pub fn version_path(folder: &str, slug: &str, version: &str) -> String {
    format!("{}/{}", version_dir(folder, slug, version), VERSION_FILE)
}

pub fn variables_path(folder: &str, slug: &str, version: &str) -> String {
    format!("{}/{}", version_dir(folder, slug, version), VARIABLES_FILE)
}

pub fn content_path(folder: &str, slug: &str, version: &str) -> String {
    format!(
        "{}/content.{}",
        version_dir(folder, slug, version),
        CONTENT_EXTENSION
    )
}

/// Trims surrounding slashes so `"/agentsmith/"` and `"agentsmith"` name the same folder.
pub fn normalize_folder(folder: &str) -> String {
    folder.trim_matches('/').to_string()
}

fn join(folder: &str, rest: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", folder, rest)
    }
}

/// A repository path recognised as part of the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryFile {
    Globals,
    Types,
    Prompt { slug: String },
    Version { slug: String, version: String },
    Variables { slug: String, version: String },
    Content { slug: String, version: String },
}

/// Classifies `path` relative to `folder`. Paths outside the folder or not
/// following the layout return `None`.
pub fn parse_library_path(folder: &str, path: &str) -> Option<LibraryFile> {
    let folder = folder.trim_matches('/');
    let relative = if folder.is_empty() {
        path
    } else {
        path.strip_prefix(folder)?.strip_prefix('/')?
    };

    let segments: Vec<&str> = relative.split('/').collect();
    match segments.as_slice() {
        [GLOBALS_FILE] => Some(LibraryFile::Globals),
        [TYPES_FILE] => Some(LibraryFile::Types),
        [PROMPTS_DIR, slug, PROMPT_FILE] if !slug.is_empty() => Some(LibraryFile::Prompt {
            slug: slug.to_string(),
        }),
        [PROMPTS_DIR, slug, version, file] if !slug.is_empty() && !version.is_empty() => {
            let slug = slug.to_string();
            let version = version.to_string();
            match *file {
                VERSION_FILE => Some(LibraryFile::Version { slug, version }),
                VARIABLES_FILE => Some(LibraryFile::Variables { slug, version }),
                f if is_content_file(f) => Some(LibraryFile::Content { slug, version }),
                _ => None,
            }
        }
        _ => None,
    }
}

fn is_content_file(name: &str) -> bool {
    name.strip_prefix("content.") == Some(CONTENT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_canonical_paths() {
        assert_eq!(globals_path("agentsmith"), "agentsmith/globals.json");
        assert_eq!(types_path("agentsmith/"), "agentsmith/agentsmith.types.ts");
        assert_eq!(
            prompt_path("agentsmith", "greeting"),
            "agentsmith/prompts/greeting/prompt.json"
        );
        assert_eq!(
            version_path("agentsmith", "greeting", "0.0.1"),
            "agentsmith/prompts/greeting/0.0.1/version.json"
        );
        assert_eq!(
            variables_path("agentsmith", "greeting", "0.0.1"),
            "agentsmith/prompts/greeting/0.0.1/variables.json"
        );
        assert_eq!(
            content_path("agentsmith", "greeting", "0.0.1"),
            "agentsmith/prompts/greeting/0.0.1/content.j2"
        );
    }

    #[test]
    fn root_folder_has_no_leading_slash() {
        assert_eq!(globals_path(""), "globals.json");
        assert_eq!(prompt_path("/", "a"), "prompts/a/prompt.json");
    }

    #[test]
    fn parse_round_trips_generated_paths() {
        let folder = "lib";
        assert_eq!(
            parse_library_path(folder, &globals_path(folder)),
            Some(LibraryFile::Globals)
        );
        assert_eq!(
            parse_library_path(folder, &types_path(folder)),
            Some(LibraryFile::Types)
        );
        assert_eq!(
            parse_library_path(folder, &prompt_path(folder, "greeting")),
            Some(LibraryFile::Prompt {
                slug: "greeting".to_string()
            })
        );
        assert_eq!(
            parse_library_path(folder, &content_path(folder, "greeting", "1.0.0")),
            Some(LibraryFile::Content {
                slug: "greeting".to_string(),
                version: "1.0.0".to_string()
            })
        );
        assert_eq!(
            parse_library_path(folder, &variables_path(folder, "greeting", "1.0.0")),
            Some(LibraryFile::Variables {
                slug: "greeting".to_string(),
                version: "1.0.0".to_string()
            })
        );
    }

    #[test]
    fn parse_ignores_foreign_and_malformed_paths() {
        assert_eq!(parse_library_path("lib", "README.md"), None);
        assert_eq!(parse_library_path("lib", "libx/globals.json"), None);
        assert_eq!(parse_library_path("lib", "lib/prompts/a/notes.txt"), None);
        assert_eq!(parse_library_path("lib", "lib/prompts/a/1.0.0/content.md"), None);
        assert_eq!(parse_library_path("lib", "lib/prompts/a/1.0.0/deep/version.json"), None);
    }
}
