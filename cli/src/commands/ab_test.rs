//! A/B test command

use crate::config::Config;
use crate::input::read_document;
use crate::output::{self, pct, KeyValue, OutputFormat};
use anyhow::{anyhow, bail, Result};
use clap::Args;
use formkit_analytics::{significance, AbTestResult, AnalyticsAggregator, TimeRange, VariantStats};
use formkit_core::{Form, Submission};
use std::path::PathBuf;

/// Either a form with variant-tagged submissions, or raw counts
#[derive(Args, Debug)]
pub struct AbTestArgs {
    #[arg(long, requires = "submissions")]
    pub form: Option<PathBuf>,
    #[arg(long, requires = "form")]
    pub submissions: Option<PathBuf>,
    #[arg(long, default_value = "all")]
    pub range: TimeRange,
    /// Control variant name
    #[arg(long, default_value = "A")]
    pub control: String,
    /// Treatment variant name
    #[arg(long, default_value = "B")]
    pub treatment: String,
    #[arg(long, conflicts_with = "form")]
    pub control_visitors: Option<u64>,
    #[arg(long, conflicts_with = "form")]
    pub control_conversions: Option<u64>,
    #[arg(long, conflicts_with = "form")]
    pub treatment_visitors: Option<u64>,
    #[arg(long, conflicts_with = "form")]
    pub treatment_conversions: Option<u64>,
}

pub fn evaluate(args: &AbTestArgs, config: &Config) -> Result<AbTestResult> {
    if let (Some(form_path), Some(submissions_path)) = (&args.form, &args.submissions) {
        let form: Form = read_document(form_path)?;
        let submissions: Vec<Submission> = read_document(submissions_path)?;
        let aggregator = AnalyticsAggregator::with_system_clock(config.analytics.clone());
        return aggregator
            .variant_test(&form, &submissions, args.range, &args.control, &args.treatment)
            .ok_or_else(|| {
                anyhow!(
                    "no submissions recorded for variant '{}' or '{}'",
                    args.control,
                    args.treatment
                )
            });
    }

    let (Some(cv), Some(cc), Some(tv), Some(tc)) = (
        args.control_visitors,
        args.control_conversions,
        args.treatment_visitors,
        args.treatment_conversions,
    ) else {
        bail!("pass --form and --submissions, or all four visitor/conversion counts");
    };
    if cc > cv || tc > tv {
        bail!("conversions cannot exceed visitors");
    }
    Ok(significance(
        &VariantStats::new(&args.control, cv, cc),
        &VariantStats::new(&args.treatment, tv, tc),
        &config.analytics,
    ))
}

pub fn handle(args: AbTestArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let result = evaluate(&args, config)?;
    format.emit(&result, || {
        vec![
            KeyValue::new(format!("{} rate", result.control.name), pct(result.control_rate)),
            KeyValue::new(format!("{} rate", result.treatment.name), pct(result.treatment_rate)),
            KeyValue::new("Lift", pct(result.lift)),
            KeyValue::new("z", format!("{:.3}", result.z_score)),
            KeyValue::new("Confidence", pct(result.confidence)),
            KeyValue::new("Significant", result.significant),
        ]
    })?;
    if format.is_table() {
        match &result.message {
            Some(message) => output::warning(message),
            None if result.significant => output::success("Difference is significant"),
            None => println!("Difference is not significant"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: AbTestArgs,
    }

    #[test]
    fn test_counts_mode() {
        let harness = Harness::parse_from([
            "ab",
            "--control-visitors",
            "1000",
            "--control-conversions",
            "100",
            "--treatment-visitors",
            "1000",
            "--treatment-conversions",
            "150",
        ]);
        let result = evaluate(&harness.args, &Config::default()).unwrap();
        assert!(result.significant);
        assert_eq!(result.control.name, "A");
    }

    #[test]
    fn test_incomplete_counts_are_rejected() {
        let harness = Harness::parse_from(["ab", "--control-visitors", "10"]);
        assert!(evaluate(&harness.args, &Config::default()).is_err());

        let harness = Harness::parse_from([
            "ab",
            "--control-visitors",
            "10",
            "--control-conversions",
            "11",
            "--treatment-visitors",
            "10",
            "--treatment-conversions",
            "1",
        ]);
        assert!(evaluate(&harness.args, &Config::default()).is_err());
    }
}
