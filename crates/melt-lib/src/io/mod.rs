pub mod grid;
pub mod points;
pub mod report;
pub mod series_csv;
pub mod text;
pub mod timestep;
