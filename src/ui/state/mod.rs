pub mod grid_state;
