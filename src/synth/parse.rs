// src/synth/parse.rs
// Lenient parser for the provider's free-form markdown. The response is
// expected to follow the section template, but any missing marker degrades
// to an empty field plus a warning, never an error.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeepDiveRef {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ParsedSynthesis {
    pub overview: Vec<String>,
    pub tools: Vec<String>,
    pub articles: Vec<String>,
    pub ai_data: Vec<String>,
    pub startups: Vec<String>,
    pub reminders: Vec<String>,
    pub deep_dive: Vec<DeepDiveRef>,
    /// Section markers absent from the response.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Overview,
    Tools,
    Articles,
    AiData,
    Startups,
    Reminders,
    DeepDive,
}

/// Match headers by keyword, ignoring emoji, case, and heading level.
fn section_for_header(line: &str) -> Section {
    let lower = line.to_lowercase();
    if lower.contains("vue d'ensemble") || lower.contains("overview") {
        Section::Overview
    } else if lower.contains("outils") || lower.contains("tools") {
        Section::Tools
    } else if lower.contains("articles") {
        Section::Articles
    } else if lower.contains("ia / data") || lower.contains("ia/data") || lower.contains("ai/data")
    {
        Section::AiData
    } else if lower.contains("startup") {
        Section::Startups
    } else if lower.contains("rappel") || lower.contains("reminder") {
        Section::Reminders
    } else if lower.contains("creuser") || lower.contains("deep dive") {
        Section::DeepDive
    } else {
        Section::None
    }
}

fn re_url() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s)\]]+").unwrap())
}

fn bullet_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .map(str::trim)
}

fn deep_dive_ref(bullet: &str) -> DeepDiveRef {
    let url = re_url()
        .find(bullet)
        .map(|m| m.as_str().trim_end_matches(['.', ',']).to_string())
        .unwrap_or_default();
    // Title is whatever precedes the arrow/url.
    let title = bullet
        .split("→")
        .next()
        .unwrap_or(bullet)
        .replace(&url, "")
        .trim()
        .trim_matches(['*', '[', ']'])
        .trim_end_matches(" -")
        .trim()
        .to_string();
    DeepDiveRef { title, url }
}

pub fn parse_synthesis(text: &str) -> ParsedSynthesis {
    let mut out = ParsedSynthesis::default();
    let mut current = Section::None;
    let mut seen: Vec<Section> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            current = section_for_header(trimmed);
            if current != Section::None && !seen.contains(&current) {
                seen.push(current);
            }
            continue;
        }
        let Some(bullet) = bullet_text(line) else {
            continue;
        };
        if bullet.is_empty() {
            continue;
        }
        match current {
            Section::Overview => out.overview.push(bullet.to_string()),
            Section::Tools => out.tools.push(bullet.to_string()),
            Section::Articles => out.articles.push(bullet.to_string()),
            Section::AiData => out.ai_data.push(bullet.to_string()),
            Section::Startups => out.startups.push(bullet.to_string()),
            Section::Reminders => out.reminders.push(bullet.to_string()),
            Section::DeepDive => out.deep_dive.push(deep_dive_ref(bullet)),
            Section::None => {}
        }
    }

    for (section, label) in [
        (Section::Overview, "vue d'ensemble"),
        (Section::Tools, "outils & projets"),
        (Section::Articles, "articles & discussions"),
        (Section::AiData, "ia / data / infra"),
        (Section::DeepDive, "à creuser"),
    ] {
        if !seen.contains(&section) {
            out.warnings.push(format!("section manquante: {label}"));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"## 🎯 Vue d'ensemble
- La semaine est dominée par Rust 1.80 (https://blog.rust-lang.org/)
- Gros mouvement côté inference locale

### 🛠️ Outils & Projets
- **owner/repo** - Un outil de build incrémental 🔗 https://github.com/owner/repo

### 📰 Articles & Discussions
- **Pourquoi les monorepos** (hackernews) - Retour d'expérience 🔗 https://a.test/mono

### 🤖 IA / Data / Infra
- Nouveau modèle open-weights 🔗 https://a.test/model

## 🔄 Rappels
- **Vieil ami** - toujours populaire 🔗 https://a.test/old

## 📚 À creuser
- Rust 1.80 release notes → https://blog.rust-lang.org/2024/
- Monorepo retour d'expérience → https://a.test/mono
"#;

    #[test]
    fn parses_all_sections() {
        let parsed = parse_synthesis(SAMPLE);
        assert_eq!(parsed.overview.len(), 2);
        assert_eq!(parsed.tools.len(), 1);
        assert_eq!(parsed.articles.len(), 1);
        assert_eq!(parsed.ai_data.len(), 1);
        assert_eq!(parsed.reminders.len(), 1);
        assert_eq!(parsed.deep_dive.len(), 2);
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.deep_dive[0].url, "https://blog.rust-lang.org/2024/");
        assert_eq!(parsed.deep_dive[0].title, "Rust 1.80 release notes");
    }

    #[test]
    fn missing_sections_yield_warnings_not_errors() {
        let parsed = parse_synthesis("## 🎯 Vue d'ensemble\n- seul point\n");
        assert_eq!(parsed.overview.len(), 1);
        assert!(parsed.tools.is_empty());
        assert!(parsed
            .warnings
            .iter()
            .any(|w| w.contains("outils & projets")));
        assert!(parsed.warnings.iter().any(|w| w.contains("à creuser")));
    }

    #[test]
    fn free_text_without_markers_parses_to_empty() {
        let parsed = parse_synthesis("Désolé, je ne peux pas produire ce format aujourd'hui.");
        assert!(parsed.overview.is_empty());
        assert!(parsed.deep_dive.is_empty());
        assert_eq!(parsed.warnings.len(), 5);
    }
}
