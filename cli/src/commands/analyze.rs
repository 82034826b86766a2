//! Analytics commands

use crate::config::Config;
use crate::input::read_document;
use crate::output::{self, pct, KeyValue, OutputFormat};
use anyhow::Result;
use clap::ValueEnum;
use formkit_analytics::{AnalyticsAggregator, AnalyticsSnapshot, TimeRange};
use formkit_core::memory::InMemoryStore;
use formkit_core::ports::SubmissionRepository;
use formkit_core::{Form, Submission};
use std::path::Path;
use tabled::Tabled;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Section {
    All,
    Overview,
    Trends,
    Fields,
    Funnel,
}

#[derive(Tabled)]
struct TrendRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Count")]
    count: u64,
    #[tabled(rename = "Cumulative")]
    cumulative: u64,
    #[tabled(rename = "Growth")]
    growth: String,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    label: String,
    #[tabled(rename = "Responses")]
    responses: u64,
    #[tabled(rename = "Completion")]
    completion: String,
    #[tabled(rename = "Distinct")]
    distinct: u64,
    #[tabled(rename = "Most common")]
    most_common: String,
    #[tabled(rename = "Avg length")]
    average_length: String,
}

#[derive(Tabled)]
struct FunnelRow {
    #[tabled(rename = "Step")]
    label: String,
    #[tabled(rename = "Completed")]
    completed: u64,
    #[tabled(rename = "Completion")]
    completion: String,
    #[tabled(rename = "Drop-off")]
    drop_off: String,
}

/// Load the submissions into an in-memory repository and snapshot it
pub async fn snapshot(
    form: &Form,
    submissions: Vec<Submission>,
    range: TimeRange,
    views: Option<u64>,
    config: &Config,
) -> Result<AnalyticsSnapshot> {
    let store = InMemoryStore::new();
    for mut submission in submissions {
        submission.form_id = form.id.clone();
        store.insert_submission(submission);
    }

    let aggregator = AnalyticsAggregator::with_system_clock(config.analytics.clone());
    let mut snapshot = (*aggregator.snapshot_from(&store, form, range).await?).clone();
    if let Some(views) = views {
        let loaded = store.get_submissions(&form.id, Default::default()).await?;
        snapshot.overview = aggregator.overview_with_views(form, &loaded, range, views);
    }
    tracing::debug!(stats = ?aggregator.stats(), "Analytics computed");
    Ok(snapshot)
}

pub async fn handle(
    form_path: &Path,
    submissions_path: &Path,
    range: TimeRange,
    views: Option<u64>,
    section: Section,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let form: Form = read_document(form_path)?;
    let submissions: Vec<Submission> = read_document(submissions_path)?;
    let snapshot = snapshot(&form, submissions, range, views, config).await?;

    if !format.is_table() {
        return match section {
            Section::All => format.emit(&snapshot, Vec::<KeyValue>::new),
            Section::Overview => format.emit(&snapshot.overview, Vec::<KeyValue>::new),
            Section::Trends => format.emit(&snapshot.trends, Vec::<KeyValue>::new),
            Section::Fields => format.emit(&snapshot.field_analysis, Vec::<KeyValue>::new),
            Section::Funnel => format.emit(&snapshot.conversion_funnel, Vec::<KeyValue>::new),
        };
    }

    println!("{} ({}, {} submissions)", form.title, range, snapshot.submission_count);
    if matches!(section, Section::All | Section::Overview) {
        print_overview(&snapshot);
    }
    if matches!(section, Section::All | Section::Trends) {
        print_trends(&snapshot);
    }
    if matches!(section, Section::All | Section::Fields) {
        print_fields(&snapshot);
    }
    if matches!(section, Section::All | Section::Funnel) {
        print_funnel(&snapshot);
    }
    Ok(())
}

fn print_overview(snapshot: &AnalyticsSnapshot) {
    let o = &snapshot.overview;
    println!(
        "{}",
        output::table(vec![
            KeyValue::new("Submissions", o.total_submissions),
            KeyValue::new("Views", o.estimated_views),
            KeyValue::new("Conversion", pct(o.conversion_rate)),
            KeyValue::new("Completion", pct(o.completion_rate)),
            KeyValue::new("Avg time (s)", format!("{:.1}", o.average_completion_secs)),
            KeyValue::new("Median time (s)", format!("{:.1}", o.median_completion_secs)),
            KeyValue::new("Bounce", pct(o.bounce_rate)),
        ])
    );
}

fn print_trends(snapshot: &AnalyticsSnapshot) {
    let trends = &snapshot.trends;
    let rows: Vec<TrendRow> = trends
        .points
        .iter()
        .map(|p| TrendRow {
            date: p.date.to_string(),
            count: p.count,
            cumulative: p.cumulative,
            growth: pct(p.growth_rate),
        })
        .collect();
    println!("{}", output::table(rows));
    if let Some(day) = trends.peak_day {
        println!("Peak: {} ({} submissions)", day, trends.peak_count);
    }
}

fn print_fields(snapshot: &AnalyticsSnapshot) {
    let rows: Vec<FieldRow> = snapshot
        .field_analysis
        .iter()
        .map(|f| FieldRow {
            label: f.label.clone(),
            responses: f.response_count,
            completion: pct(f.completion_rate),
            distinct: f.distinct_values,
            most_common: f
                .most_common_value
                .as_ref()
                .map(|v| format!("{} ({})", v, f.most_common_count))
                .unwrap_or_default(),
            average_length: format!("{:.1}", f.average_length),
        })
        .collect();
    println!("{}", output::table(rows));
}

fn print_funnel(snapshot: &AnalyticsSnapshot) {
    let rows: Vec<FunnelRow> = snapshot
        .conversion_funnel
        .iter()
        .map(|s| FunnelRow {
            label: s.label.clone(),
            completed: s.completed,
            completion: pct(s.completion_rate),
            drop_off: pct(s.drop_off_rate),
        })
        .collect();
    println!("{}", output::table(rows));
}
