use super::super::stats::SummaryStatistics;
use super::views::Summary;
use std::fmt::{self, Write};

pub(crate) const SECTIONS: [&str; 5] = [
    "=== DATASET OVERVIEW ===",
    "=== PRIMARY METRIC ===",
    "=== CONTEXTUAL METRICS ===",
    "=== REPRESENTATIVE SAMPLE ===",
    "=== PROVENANCE ===",
];

impl Summary {
    /// Fixed-section plain-text report for the text-generation consumer.
    pub fn render_text(&self) -> String {
        self.to_string()
    }

    fn write_overview(&self, out: &mut impl Write) -> fmt::Result {
        writeln!(out, "{}", SECTIONS[0])?;
        writeln!(out, "Analysis type: {}", self.analysis_type)?;
        writeln!(
            out,
            "Records: {} received, {} after filtering, {} scored",
            self.counts.raw_records, self.counts.filtered_records, self.counts.scored_records
        )?;
        if self.counts.reported_total > self.counts.raw_records {
            writeln!(out, "Upstream total: {}", self.counts.reported_total)?;
        }
        writeln!(out, "Layers:")?;
        for layer in &self.layers {
            if layer.presampled {
                writeln!(
                    out,
                    "- {} ({}): {} of {} records",
                    layer.name, layer.id, layer.records, layer.total_count
                )?;
            } else {
                writeln!(out, "- {} ({}): {} records", layer.name, layer.id, layer.records)?;
            }
        }
        Ok(())
    }

    fn write_primary(&self, out: &mut impl Write) -> fmt::Result {
        writeln!(out, "{}", SECTIONS[1])?;
        writeln!(
            out,
            "Field: {} ({})",
            self.field.primary,
            self.field.source.label()
        )?;
        match (&self.statistics, &self.statistics_notice) {
            (Some(stats), _) => write_statistics(out, stats),
            (None, Some(notice)) => writeln!(out, "{notice}"),
            (None, None) => writeln!(out, "None"),
        }
    }

    fn write_contextual(&self, out: &mut impl Write) -> fmt::Result {
        writeln!(out, "{}", SECTIONS[2])?;
        if self.contextual.is_empty() {
            return writeln!(out, "None");
        }
        for metric in &self.contextual {
            let stats = &metric.statistics;
            writeln!(
                out,
                "- {} ({}): mean {:.2}, median {:.2}, min {:.2}, max {:.2} (n={})",
                metric.label, metric.field, stats.mean, stats.median, stats.min, stats.max, stats.count
            )?;
        }
        Ok(())
    }

    fn write_sample(&self, out: &mut impl Write) -> fmt::Result {
        writeln!(out, "{}", SECTIONS[3])?;
        if self.sample.is_empty() {
            return writeln!(out, "None");
        }
        for entry in &self.sample {
            match entry.score {
                Some(score) => writeln!(
                    out,
                    "{}. {} [{}] score {:.2} ({})",
                    entry.position, entry.label, entry.code, score, entry.category_label
                )?,
                None => writeln!(
                    out,
                    "{}. {} [{}] no score ({})",
                    entry.position, entry.label, entry.code, entry.category_label
                )?,
            }
        }
        Ok(())
    }

    fn write_provenance(&self, out: &mut impl Write) -> fmt::Result {
        writeln!(out, "{}", SECTIONS[4])?;
        if self.provenance.is_empty() {
            return writeln!(out, "None");
        }
        for note in &self.provenance {
            writeln!(out, "- [{}] {}", note.kind.label(), note.detail)?;
        }
        Ok(())
    }
}

fn write_statistics(out: &mut impl Write, stats: &SummaryStatistics) -> fmt::Result {
    writeln!(out, "Count: {}", stats.count)?;
    writeln!(
        out,
        "Min: {:.2} | Max: {:.2} | Range: {:.2}",
        stats.min,
        stats.max,
        stats.range()
    )?;
    writeln!(
        out,
        "Mean: {:.2} | Median: {:.2} | Std dev: {:.2}",
        stats.mean, stats.median, stats.std_dev
    )?;
    writeln!(
        out,
        "Q1: {:.2} | Q3: {:.2} | IQR: {:.2}",
        stats.q1,
        stats.q3,
        stats.iqr()
    )
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_overview(f)?;
        writeln!(f)?;
        self.write_primary(f)?;
        writeln!(f)?;
        self.write_contextual(f)?;
        writeln!(f)?;
        self.write_sample(f)?;
        writeln!(f)?;
        self.write_provenance(f)
    }
}
