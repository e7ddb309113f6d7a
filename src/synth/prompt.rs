// src/synth/prompt.rs
// Prompt construction. Bounded on both axes: item count per category and
// summary length per item, so one run stays inside the provider's context.

use chrono::{DateTime, Utc};

use crate::normalize::CanonicalItem;
use crate::pipeline::DigestRequest;
use crate::sources::types::Category;

pub const MAX_ITEMS_PER_CATEGORY: usize = 15;
pub const MAX_REMINDERS: usize = 10;
const MAX_SUMMARY_CHARS: usize = 150;

pub const SYSTEM_PROMPT: &str = "\
Tu es un assistant de veille technologique expert. Tu synthétises les \
informations collectées pour un développeur/ingénieur full-stack, DevOps ou IA.

RÈGLES STRICTES:
- Utilise UNIQUEMENT les informations fournies dans les données
- Ne jamais inventer de liens, noms d'outils ou statistiques
- Reste factuel, pas de hype exagérée
- Français avec termes techniques en anglais
- TOUJOURS inclure les URLs des sources
- Les items marqués [RAPPEL] ont déjà été mentionnés les jours précédents

FORMAT DE RÉPONSE OBLIGATOIRE:

## 🎯 Vue d'ensemble
- [3-5 points clés, avec lien vers la source principale]

### 🛠️ Outils & Projets
- **[Nom]** - [1 phrase de contexte] 🔗 [URL]

### 📰 Articles & Discussions
- **[Titre]** ([source]) - [1-2 phrases de résumé] 🔗 [URL]

### 🤖 IA / Data / Infra
- [Mises à jour notables] 🔗 [URL]

### 🚀 Startups
- **[Nom]** - [financement/annonce] 🔗 [URL]

## 🔄 Rappels
- **[Nom]** - [courte description] 🔗 [URL]

## 📚 À creuser
- [Titre] → [URL complète]
";

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

fn format_items(lines: &mut String, items: &[&CanonicalItem]) {
    if items.is_empty() {
        lines.push_str("[Aucune donnée]\n");
        return;
    }
    for (i, item) in items.iter().enumerate() {
        let marker = if item.is_recurring { " [RAPPEL]" } else { "" };
        lines.push_str(&format!("{}. [{}]{} {}", i + 1, item.source, marker, item.title));
        if let Some(summary) = &item.summary {
            lines.push_str(" | ");
            lines.push_str(truncate_chars(summary, MAX_SUMMARY_CHARS));
        }
        lines.push('\n');
        lines.push_str(&format!("   URL: {}\n", item.url));
    }
}

fn take_by_category<'a>(
    items: &'a [CanonicalItem],
    category: Category,
    recurring: bool,
) -> Vec<&'a CanonicalItem> {
    items
        .iter()
        .filter(|i| i.category == category && i.is_recurring == recurring)
        .take(MAX_ITEMS_PER_CATEGORY)
        .collect()
}

/// One self-contained prompt: instructions, run context, then the collected
/// data grouped the same way the response template is.
pub fn build_prompt(
    items: &[CanonicalItem],
    request: &DigestRequest,
    now: DateTime<Utc>,
) -> String {
    let mut data = String::new();

    data.push_str("\n## Données collectées - NOUVEAUTÉS\n\n### Outils & Projets\n");
    format_items(&mut data, &take_by_category(items, Category::Tool, false));
    data.push_str("\n### Articles & Discussions\n");
    format_items(&mut data, &take_by_category(items, Category::Article, false));
    data.push_str("\n### IA / Data / Infra\n");
    format_items(&mut data, &take_by_category(items, Category::AiDataInfra, false));
    data.push_str("\n### Startups\n");
    format_items(&mut data, &take_by_category(items, Category::Startup, false));

    data.push_str("\n## RAPPELS (déjà mentionnés, toujours populaires)\n");
    let reminders: Vec<&CanonicalItem> = items
        .iter()
        .filter(|i| i.is_recurring)
        .take(MAX_REMINDERS)
        .collect();
    format_items(&mut data, &reminders);

    format!(
        "{SYSTEM_PROMPT}\nRequête utilisateur: \"{}\"\nFocus: {}\nDate: {}\n{}\n\nGénère une synthèse de veille tech structurée selon le format demandé.\nBase-toi UNIQUEMENT sur les données ci-dessus.",
        request.query,
        request.focus.as_str(),
        now.format("%d/%m/%Y"),
        data
    )
}
