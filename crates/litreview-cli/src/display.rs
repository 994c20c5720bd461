//! Terminal rendering for jobs, papers, and filter sets.

use std::fmt::Write;

use chrono::NaiveDateTime;
use litreview_client::{JobSnapshot, LoadState, SearchSnapshot};
use litreview_core::{FilterSet, Job, RelatedPaper, SearchResponse};

const MAX_AUTHORS: usize = 3;
const ABSTRACT_CHARS: usize = 240;

// ── Jobs ──

/// `2025-03-01T10:00:00.123456` → `2025-03-01 10:00`; unparsable input is shown as is.
fn format_created(created_at: &str) -> String {
    created_at
        .parse::<NaiveDateTime>()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| created_at.to_string())
}

fn status_label(job: &Job) -> String {
    format!("{:?}", job.status).to_lowercase()
}

pub fn print_job_card(job: &Job) {
    println!("=== {} ===", job.topic);
    println!("  {:<14} {}", "job", job.job_id);
    println!("  {:<14} {}", "status", status_label(job));
    println!("  {:<14} {}", "created", format_created(&job.created_at));

    let f = &job.filters;
    match (f.start_year, f.end_year) {
        (None, None) => {}
        (start, end) => println!(
            "  {:<14} {} to {}",
            "years",
            start.map_or("any".to_string(), |y| y.to_string()),
            end.map_or("any".to_string(), |y| y.to_string()),
        ),
    }
    for (label, items) in [
        ("include", &f.include_keywords),
        ("exclude", &f.exclude_keywords),
        ("venues", &f.venues),
    ] {
        if !items.is_empty() {
            println!("  {:<14} {}", label, items.join(", "));
        }
    }
    println!("  {:<14} {}", "limit", f.limit);

    for (label, path) in [
        ("markdown", &job.markdown_path),
        ("json", &job.json_path),
        ("csv", &job.csv_path),
    ] {
        if let Some(path) = path {
            println!("  {:<14} {}", label, path);
        }
    }
    if let Some(message) = &job.message {
        println!("  {:<14} {}", "message", message);
    }
    println!();
}

pub fn print_jobs_table(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("(no jobs)");
        return;
    }
    println!("{:<38} {:<8} {:<17} TOPIC", "JOB", "STATUS", "CREATED");
    for job in jobs {
        println!(
            "{:<38} {:<8} {:<17} {}",
            job.job_id,
            status_label(job),
            format_created(&job.created_at),
            job.topic
        );
    }
}

pub fn print_job_progress(snapshot: &JobSnapshot) {
    let id = snapshot.job_id.as_deref().unwrap_or("(pending)");
    match &snapshot.last_error {
        Some(err) => println!("[{id}] {} (poll {}): {err}", snapshot.phase, snapshot.polls),
        None => println!("[{id}] {} (poll {})", snapshot.phase, snapshot.polls),
    }
}

// ── Papers ──

pub fn render_papers(response: &SearchResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} of {} results for \"{}\" ({})",
        response.papers.len(),
        response.total_results,
        response.query,
        response.mode
    );
    for (i, paper) in response.papers.iter().enumerate() {
        let _ = write!(out, "{:>3}. {}", i + 1, paper.title);
        if let Some(year) = paper.year {
            let _ = write!(out, " ({year})");
        }
        out.push('\n');

        let mut authors = paper.authors.iter().take(MAX_AUTHORS).cloned().collect::<Vec<_>>();
        if paper.authors.len() > MAX_AUTHORS {
            authors.push("et al.".to_string());
        }
        let byline = [
            (!authors.is_empty()).then(|| authors.join(", ")),
            paper.venue.clone(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" · ");
        if !byline.is_empty() {
            let _ = writeln!(out, "     {byline}");
        }
        if let Some(link) = paper.doi.as_ref().map(|d| format!("doi:{d}")).or(paper.url.clone()) {
            let _ = writeln!(out, "     {link}");
        }
        let _ = writeln!(out, "     id: {}", paper.id);
    }
    out
}

pub fn print_papers(response: &SearchResponse) {
    print!("{}", render_papers(response));
}

pub fn print_abstracts(response: &SearchResponse) {
    for paper in &response.papers {
        let Some(text) = &paper.abstract_text else {
            continue;
        };
        let short: String = text.chars().take(ABSTRACT_CHARS).collect();
        let ellipsis = if text.chars().count() > ABSTRACT_CHARS { "…" } else { "" };
        println!("{}\n  {short}{ellipsis}\n", paper.title);
    }
}

pub fn print_related(paper_id: &str, related: &[RelatedPaper]) {
    println!("Related to {paper_id}:");
    if related.is_empty() {
        println!("  (none)");
    }
    for paper in related {
        match paper.year {
            Some(year) => println!("  - {} ({year}) [{}]", paper.title, paper.id),
            None => println!("  - {} [{}]", paper.title, paper.id),
        }
    }
}

// ── Query state ──

pub fn render_filters(filters: &FilterSet) -> String {
    let mut out = String::new();
    if let Some(text) = &filters.natural_language_text {
        let _ = writeln!(out, "  {:<18} {}", "query", text);
    }
    let constraints = filters.constraints();
    if constraints.is_empty() {
        let _ = writeln!(out, "  (no constraints)");
    }
    for c in constraints {
        let _ = writeln!(out, "  {:<18} {}", c.field.name(), c.value);
    }
    out
}

pub fn print_search_state(snapshot: &SearchSnapshot) {
    match snapshot.load {
        LoadState::Loading => println!("searching…"),
        LoadState::Refreshing => println!("refreshing…"),
        LoadState::Idle => {}
    }
    if let Some(failure) = &snapshot.error {
        eprintln!("search {} failed ({:?}): {}", failure.nonce, failure.kind, failure.message);
    }
}
