// Calf Ledger - Core Library
// Record store, reporting transforms and timeline builder shared by the
// CLI, the TUI and the API server

pub mod config;
pub mod error;
pub mod records;
pub mod reports;
pub mod store;
pub mod timeline;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::Config;
pub use error::{RecordError, RecordResult};
pub use records::{
    CalfRecord, TreatmentRecord, TableRecord,
    format_br_date, parse_br_date,
    CALF_COLUMNS, TREATMENT_COLUMNS, DATE_FORMAT,
};
pub use store::{
    RecordStore, LoadedTable, LoadStatus, Notice, NoticeLevel,
    load_calf_registry, load_treatment_log,
    append_calf, append_treatment,
    persist_calf_registry, persist_treatment_log,
};
pub use reports::{
    Tally, ChartSummary, ALL_PROPERTIES,
    count_by_property, count_by_reason, count_by_responsible, count_by_dose_count,
    treatments_over_time, filter_by_property, property_options, ear_tag_options,
};
pub use timeline::{
    TimelineEvent, EventCategory, TimelineError,
    build_timeline, request_timeline, order_for_display,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
