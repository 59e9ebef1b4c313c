pub mod grid_view;
pub mod state;
