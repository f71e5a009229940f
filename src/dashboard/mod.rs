/// Dashboard layer: turns a session's filtered table into a view model.
///
/// ```text
///   ListingTable + FilterCriteria + AppConfig
///        │
///        ▼
///   DashboardContext   (filtered TableView, selected bedrooms)
///        │  render()
///        ▼
///   ViewModel          (table rows, towns, Panel { PanelBody })
/// ```

pub mod charts;
pub mod context;
pub mod view;

pub use context::{initial_criteria, DashboardContext};
pub use view::{render, Panel, PanelBody, ViewModel, NO_MATCHES};
