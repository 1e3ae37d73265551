//! Band renderer.
//!
//! ```text
//!  ObservationSeries + PlotConfig
//!        │
//!        ▼
//!   ┌─────────────┐
//!   │ SierraScene │  bands (widest → narrowest), estimate step line,
//!   └─────────────┘  reference line, axis layout
//!        │ draw()
//!        ▼
//!   ┌─────────┐
//!   │ Surface │  egui_plot viewer / plotters PNG
//!   └─────────┘
//! ```

pub mod scene;
pub mod surface;

pub use scene::{
    step_ticks, AxisLayout, AxisScale, BandLayer, ReferenceLine, SierraScene, StepRegion,
};
pub use surface::Surface;
