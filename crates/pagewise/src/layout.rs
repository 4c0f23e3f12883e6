use std::path::PathBuf;

use colored::Colorize;
use pagewise_core::spacing::SpacingRule;

use crate::input::prepare;
use crate::prelude::{println, *};

#[derive(Debug, Clone, clap::Args)]
pub struct LayoutOptions {
    /// Extracted lines (JSON)
    pub path: PathBuf,
}

#[derive(Debug, Clone, clap::Args)]
pub struct RulesOptions {
    /// Extracted lines (JSON)
    pub path: PathBuf,

    /// Print the rules as JSON instead of a table
    #[clap(long)]
    pub json: bool,
}

pub async fn rules(options: RulesOptions, global: crate::Global) -> Result<()> {
    let (layout, _) = prepare(&options.path, &global).await?;

    if options.json {
        return print_json(&layout.rules);
    }

    if layout.rules.is_empty() {
        println!("No spacing rules: the document has no consecutive lines sharing a font size.");
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Context", "Mode", "Line band", "Para max", "Samples", "Status"
    ]);
    for rule in layout.rules.iter() {
        table.add_row(prettytable::row![
            rule.context,
            f!("{:.2}", rule.most_common_gap),
            f!(
                "{:.2} - {:.2}",
                rule.line_spacing_range.0,
                rule.line_spacing_range.1
            ),
            f!("{:.2}", rule.para_spacing_max),
            rule.sample_count,
            status(rule)
        ]);
    }
    table.printstd();

    if let Some(dominant) = layout.rules.dominant() {
        println!();
        println!("Unseen sizes fall back to the {} rule.", dominant.context);
    }

    Ok(())
}

fn status(rule: &SpacingRule) -> colored::ColoredString {
    if rule.bands_overlap() {
        "overlapping bands".red()
    } else if rule.low_confidence {
        "low confidence".yellow()
    } else {
        "ok".green()
    }
}

pub async fn blocks(options: LayoutOptions, global: crate::Global) -> Result<()> {
    let (layout, _) = prepare(&options.path, &global).await?;
    print_json(&layout.pages)
}

pub async fn boundaries(options: LayoutOptions, global: crate::Global) -> Result<()> {
    let (layout, _) = prepare(&options.path, &global).await?;
    print_json(&layout.boundaries)
}
