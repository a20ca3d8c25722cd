//! Monitoring and dashboard

pub mod dashboard;

pub use dashboard::{
    create_router, start_dashboard, AppState, DashboardMetrics, DashboardState,
};
