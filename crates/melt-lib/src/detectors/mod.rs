pub mod crossing;
