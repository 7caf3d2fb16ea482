//! Report rendering
//!
//! [`build_report_view`] turns a render decision into a channel-neutral
//! [`ReportView`]; [`render_plain_lines`] flattens a view into text lines.
//! Adapters with richer markup format [`ReportEntry`] values themselves.

pub mod plain;
pub mod report_view;

pub use plain::{entry_text, header_text, render_plain_lines};
pub use report_view::{
    build_report_view, EntryChange, RenderOptions, ReportEntry, ReportScope, ReportView,
    DEFAULT_DNS_NOTICE, DEFAULT_LOAD_ERROR_NOTICE, DEFAULT_TITLE,
};
