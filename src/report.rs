// src/report.rs
// Final digest shape and its markdown rendering. `render` is a pure template
// expansion: the same report value always produces byte-identical output.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::normalize::CanonicalItem;
use crate::sources::types::{Category, Focus, SourceFailure};
use crate::synth::parse::DeepDiveRef;
use crate::synth::SynthesisDraft;

#[derive(Debug, Default, Clone, Serialize)]
pub struct DigestStats {
    pub tool_count: usize,
    pub article_count: usize,
    pub ai_data_count: usize,
    pub startup_count: usize,
    pub new_count: usize,
    pub recurring_count: usize,
    pub api_call_count: u32,
    pub source_failures: usize,
    pub synthesis_degraded: bool,
}

#[derive(Debug, Serialize)]
pub struct DigestReport {
    pub generated_at: DateTime<Utc>,
    pub query: String,
    pub focus: Focus,
    pub overview: Vec<String>,
    pub tools: Vec<String>,
    pub articles: Vec<String>,
    pub ai_data: Vec<String>,
    pub startups: Vec<String>,
    pub reminders: Vec<String>,
    pub deep_dive: Vec<DeepDiveRef>,
    pub warnings: Vec<String>,
    pub stats: DigestStats,
}

/// Merge the synthesis draft with the item set and the collection failures
/// into the final report, computing the remaining stats.
pub fn finalize(
    draft: SynthesisDraft,
    items: &[CanonicalItem],
    failures: &[SourceFailure],
    query: &str,
    focus: Focus,
    generated_at: DateTime<Utc>,
) -> DigestReport {
    let mut stats = DigestStats {
        api_call_count: draft.api_call_count,
        source_failures: failures.len(),
        synthesis_degraded: draft.degraded,
        ..Default::default()
    };
    for item in items {
        match item.category {
            Category::Tool => stats.tool_count += 1,
            Category::Article | Category::Reminder => stats.article_count += 1,
            Category::AiDataInfra => stats.ai_data_count += 1,
            Category::Startup => stats.startup_count += 1,
        }
        if item.is_recurring {
            stats.recurring_count += 1;
        } else {
            stats.new_count += 1;
        }
    }

    let parsed = draft.parsed;
    DigestReport {
        generated_at,
        query: query.to_string(),
        focus,
        overview: parsed.overview,
        tools: parsed.tools,
        articles: parsed.articles,
        ai_data: parsed.ai_data,
        startups: parsed.startups,
        reminders: parsed.reminders,
        deep_dive: parsed.deep_dive,
        warnings: parsed.warnings,
        stats,
    }
}

fn push_section(out: &mut String, header: &str, bullets: &[String]) {
    if bullets.is_empty() {
        return;
    }
    out.push_str(header);
    out.push('\n');
    for b in bullets {
        out.push_str("- ");
        out.push_str(b);
        out.push('\n');
    }
    out.push('\n');
}

/// Deterministic markdown rendering. Missing optional sections are omitted,
/// never rendered as placeholders.
pub fn render(report: &DigestReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "# 🔍 Veille Tech — {}\n\n",
        report.generated_at.format("%d/%m/%Y %H:%M")
    ));
    out.push_str(&format!("**Requête:** {}\n", report.query));
    out.push_str(&format!("**Focus:** {}\n\n---\n\n", report.focus.as_str()));

    if report.stats.synthesis_degraded {
        out.push_str("*Synthèse générée en mode dégradé (LLM indisponible ou quota dépassé)*\n\n");
    }

    push_section(&mut out, "## 🎯 Vue d'ensemble", &report.overview);

    let has_news = !(report.tools.is_empty()
        && report.articles.is_empty()
        && report.ai_data.is_empty()
        && report.startups.is_empty());
    if has_news {
        out.push_str("## 🆕 Nouveautés\n\n");
        push_section(&mut out, "### 🛠️ Outils & Projets", &report.tools);
        push_section(&mut out, "### 📰 Articles & Discussions", &report.articles);
        push_section(&mut out, "### 🤖 IA / Data / Infra", &report.ai_data);
        push_section(&mut out, "### 🚀 Startups", &report.startups);
    }
    push_section(&mut out, "## 🔄 Rappels (toujours populaires)", &report.reminders);

    if !report.deep_dive.is_empty() {
        out.push_str("## 📚 À creuser\n");
        for pick in &report.deep_dive {
            out.push_str(&format!("- {} → {}\n", pick.title, pick.url));
        }
        out.push('\n');
    }

    out.push_str("---\n");
    out.push_str(&format!(
        "📊 **Stats**: {} outils | {} articles | {} IA/data\n",
        report.stats.tool_count, report.stats.article_count, report.stats.ai_data_count
    ));
    out.push_str(&format!(
        "🆕 **Nouveautés**: {} | 🔄 **Rappels**: {}\n",
        report.stats.new_count, report.stats.recurring_count
    ));
    out.push_str(&format!("🔁 **Appels API**: {}\n", report.stats.api_call_count));
    if report.stats.source_failures > 0 {
        out.push_str(&format!(
            "⚠️ **Erreurs**: {} source(s) indisponible(s)\n",
            report.stats.source_failures
        ));
    }

    out
}
