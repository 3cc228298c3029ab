pub(crate) mod assemble;
mod render;
pub mod views;

pub(crate) use render::SECTIONS;

pub use views::{
    ContextualStatistics, LayerOverview, ProvenanceKind, ProvenanceNote, SampleEntryView, Summary,
    SummaryCounts,
};
