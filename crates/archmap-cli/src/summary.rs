use archmap_cli::workflow::{MapRunResult, RenumberResult, RunStatus};
use archmap_core::{CandidateReason, CategorySource, ClassificationPreview, RunSummary};
use archmap_model::DataWarning;
use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

pub fn print_run_summary(result: &MapRunResult) {
    println!("Project: {}", result.project);
    println!("Output: {}", result.output_dir.display());
    match result.status {
        RunStatus::Completed => println!("Status: completed in {:.1}s", result.elapsed.as_secs_f64()),
        RunStatus::Cancelled { after } => println!("Status: cancelled after {after}"),
    }
    if let Some(summary) = &result.summary {
        println!("{}", stage_table(summary));
    }
    if let Some(outputs) = &result.outputs {
        println!("Layers written: {}", outputs.layers.len());
        println!("Heritage table: {}", outputs.heritage_table.display());
        println!("Manifest: {}", outputs.manifest.display());
    }
    println!("Source layers relocated: {}", result.relocated);
    println!("Run log: {}", result.log.display());
    print_warnings(&result.warnings);
    if !result.candidates.is_empty() {
        println!();
        println!("Exclusion candidates ({}):", result.candidates.len());
        let mut table = styled_table(&["Site", "Layer", "Reason"]);
        for candidate in &result.candidates {
            table.add_row(vec![
                Cell::new(&candidate.name),
                dim_cell(&candidate.source_layer),
                Cell::new(reason_label(&candidate.reason)),
            ]);
        }
        println!("{table}");
    }
}

fn stage_table(summary: &RunSummary) -> Table {
    let mut table = styled_table(&["Stage", "Count", "Detail"]);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![
        stage_cell("heritage collection"),
        Cell::new(summary.collected),
        dim_cell("sites from all heritage layers"),
    ]);
    if let Some(topo) = &summary.topo {
        table.add_row(vec![
            stage_cell("topo merge"),
            Cell::new(topo.features),
            dim_cell(format!(
                "{} layers, {} boundary features dropped",
                topo.layers, topo.dropped_boundaries
            )),
        ]);
    }
    if let Some(dissolve) = &summary.dissolve {
        let detail = if dissolve.fell_back {
            Cell::new(format!("{} sites kept, dissolve fell back", dissolve.before)).fg(Color::Yellow)
        } else {
            dim_cell(format!("{} -> {} sites", dissolve.before, dissolve.after))
        };
        table.add_row(vec![stage_cell("dissolve"), Cell::new(dissolve.after), detail]);
    }
    let range = &summary.range;
    table.add_row(vec![
        stage_cell("range filter"),
        Cell::new(range.included),
        dim_cell(format!(
            "{} in range, {} out of range, {} manual",
            range.in_range, range.out_of_range, range.manually_excluded
        )),
    ]);
    let classification = &summary.classification;
    table.add_row(vec![
        stage_cell("classification"),
        Cell::new(classification.by_reference + classification.by_rule),
        dim_cell(format!(
            "{} by reference, {} by rule, {} unmatched, {} candidates",
            classification.by_reference,
            classification.by_rule,
            classification.unmatched,
            classification.candidates.len()
        )),
    ]);
    let numbering = &summary.numbering;
    let tiers = if numbering.tiering_applied {
        let per_tier: Vec<String> = numbering.per_tier.iter().map(ToString::to_string).collect();
        format!("per tier: {}", per_tier.join(" / "))
    } else {
        "no tiering".to_string()
    };
    table.add_row(vec![stage_cell("numbering"), Cell::new(numbering.numbered), dim_cell(tiers)]);
    table.add_row(vec![
        stage_cell("zone split"),
        Cell::new(summary.zone_segments),
        dim_cell("zone segments"),
    ]);
    table
}

fn print_warnings(warnings: &[DataWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!();
    println!("Warnings ({}):", warnings.len());
    let mut table = styled_table(&["#", "Warning"]);
    align_column(&mut table, 0, CellAlignment::Right);
    for (index, warning) in warnings.iter().enumerate() {
        table.add_row(vec![dim_cell(index + 1), Cell::new(warning).fg(Color::Yellow)]);
    }
    println!("{table}");
}

pub fn print_renumber(result: &RenumberResult) {
    println!(
        "Layer '{}': {} of {} sites numbered ({} hidden)",
        result.layer, result.numbered, result.total, result.hidden
    );
    println!("Written: {}", result.output.display());
    print_warnings(&result.warnings);
}

pub fn print_classification(preview: &ClassificationPreview, all: bool) {
    let scan = &preview.scan;
    println!("Scanned {} features, {} matched a category", scan.total, scan.matched);
    let mut table = styled_table(&["Category", "Source", "Count", "Non-site"]);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Center);
    for category in &scan.categories {
        table.add_row(vec![
            Cell::new(&category.category),
            dim_cell(source_label(category.source)),
            Cell::new(category.count),
            if category.non_site {
                Cell::new("✓").fg(Color::Yellow).add_attribute(Attribute::Bold)
            } else {
                dim_cell("-")
            },
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL").fg(Color::Cyan).add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(scan.total).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    println!("{table}");

    let report = &preview.report;
    println!(
        "Classified {} by reference, {} by rule; {} unmatched; {} designated sites preserved",
        report.by_reference, report.by_rule, report.unmatched, report.preserved
    );
    if all {
        let mut sites = styled_table(&["Site", "Layer", "Era", "Type"]);
        for site in &preview.sites {
            sites.add_row(vec![
                Cell::new(&site.name),
                dim_cell(&site.source_layer_name),
                Cell::new(site.era.as_deref().unwrap_or("-")),
                Cell::new(site.site_type.as_deref().unwrap_or("-")),
            ]);
        }
        println!("{sites}");
    }
    if !report.candidates.is_empty() {
        println!();
        println!("Exclusion candidates ({}):", report.candidates.len());
        let mut candidates = styled_table(&["Site", "Layer", "Reason"]);
        for candidate in &report.candidates {
            candidates.add_row(vec![
                Cell::new(&candidate.name),
                dim_cell(&candidate.source_layer),
                Cell::new(reason_label(&candidate.reason)),
            ]);
        }
        println!("{candidates}");
    }
}

fn reason_label(reason: &CandidateReason) -> String {
    match reason {
        CandidateReason::Unclassified => "unclassified".to_string(),
        CandidateReason::NonSite { category } => format!("non-site ({category})"),
        CandidateReason::ModernEra { era } => format!("modern era ({era})"),
    }
}

fn source_label(source: CategorySource) -> &'static str {
    match source {
        CategorySource::Designated => "designated",
        CategorySource::Attribute => "attribute",
        CategorySource::Inferred => "inferred",
        CategorySource::Unclassified => "-",
    }
}

fn styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_header(headers.iter().copied().map(header_cell).collect::<Vec<_>>());
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
    table
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn stage_cell(label: &str) -> Cell {
    Cell::new(label).fg(Color::Blue).add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
